//! Admin routes for the pattern store.
//!
//! Guarded by the admin key middleware.

use axum::{extract::State, Json};
use domain::models::UsagePattern;
use serde::Serialize;
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_pattern_reset;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternListResponse {
    pub count: usize,
    pub patterns: Vec<UsagePattern>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub deleted: u64,
}

/// GET /api/v1/admin/patterns
pub async fn list_patterns(
    State(state): State<AppState>,
) -> Result<Json<PatternListResponse>, ApiError> {
    let patterns = state.patterns.list_all().await?;
    Ok(Json(PatternListResponse {
        count: patterns.len(),
        patterns,
    }))
}

/// DELETE /api/v1/admin/patterns (legacy: POST /api/reset-db)
pub async fn reset_patterns(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let deleted = state.patterns.reset().await.map_err(|e| {
        warn!(error = %e, "Pattern store reset failed");
        ApiError::from(e)
    })?;

    record_pattern_reset(deleted);
    info!(deleted, "Admin reset pattern store");

    Ok(Json(ResetResponse {
        status: "success",
        deleted,
    }))
}
