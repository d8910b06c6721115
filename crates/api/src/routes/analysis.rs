//! Analysis endpoint.

use axum::{extract::State, Json};
use domain::models::{AnalysisResponse, DeviceSnapshot};
use tracing::info;

use crate::app::AppState;
use crate::extractors::ValidatedJson;
use crate::middleware::record_analysis;

/// POST /api/v1/analyze (legacy: POST /api/analyze)
///
/// Runs the analysis pipeline over one device snapshot. Once the body
/// validates, the response is always 200 with a well-formed payload;
/// upstream failures degrade to rule-based output.
pub async fn analyze(
    State(state): State<AppState>,
    ValidatedJson(snapshot): ValidatedJson<DeviceSnapshot>,
) -> Json<AnalysisResponse> {
    let device_id = snapshot.device_id.clone();
    let app_count = snapshot.apps.len();

    let response = state.pipeline.analyze(snapshot).await;

    record_analysis(response.response_type.as_str(), response.success);
    info!(
        device_id = %device_id,
        apps = app_count,
        response_type = response.response_type.as_str(),
        actions = response.actionable.len(),
        insights = response.insights.len(),
        "Analysis served"
    );

    Json(response)
}
