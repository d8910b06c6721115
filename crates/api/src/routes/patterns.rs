//! Usage pattern lookup.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::DevicePatternsResponse;
use shared::validation::validate_device_id;
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;

/// GET /api/v1/patterns/:device_id (legacy: GET /api/patterns/:device_id)
///
/// Stored pattern text per package for one device. A device with no
/// history yields an empty map.
pub async fn get_device_patterns(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DevicePatternsResponse>, ApiError> {
    validate_device_id(&device_id).map_err(|e| {
        ApiError::validation(
            e.message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Invalid device ID".to_string()),
        )
    })?;

    let patterns = state.patterns.get_patterns(&device_id).await?;
    debug!(device_id = %device_id, count = patterns.len(), "Patterns served");

    Ok(Json(DevicePatternsResponse {
        device_id,
        patterns,
    }))
}
