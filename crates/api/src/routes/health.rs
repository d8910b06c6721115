//! Health check endpoint handlers.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pattern_store: PatternStoreHealth,
    pub reasoning: ReasoningHealth,
}

/// Pattern store health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PatternStoreHealth {
    pub backend: String,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Reasoning service status. Analysis works without it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReasoningHealth {
    pub enabled: bool,
    pub model: Option<String>,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// GET /api/health
///
/// Reports "healthy" when the pattern store answers, "degraded" otherwise.
/// Always 200: analysis keeps working without the store.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let start = Instant::now();
    let connected = state.patterns.ping().await.is_ok();
    let latency_ms = start.elapsed().as_millis() as u64;

    let reasoning = &state.config.reasoning;
    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pattern_store: PatternStoreHealth {
            backend: state.storage_backend().to_string(),
            connected,
            latency_ms: connected.then_some(latency_ms),
        },
        reasoning: ReasoningHealth {
            enabled: reasoning.enabled,
            model: reasoning.enabled.then(|| reasoning.model.clone()),
        },
    })
}

/// GET /api/health/live
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// GET /api/health/ready
///
/// 503 until the pattern store answers.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    if state.patterns.ping().await.is_ok() {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.3.0".to_string(),
            pattern_store: PatternStoreHealth {
                backend: "memory".to_string(),
                connected: true,
                latency_ms: Some(1),
            },
            reasoning: ReasoningHealth {
                enabled: false,
                model: None,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["pattern_store"]["backend"], "memory");
        assert_eq!(json["pattern_store"]["latency_ms"], 1);
        assert!(json["reasoning"]["model"].is_null());
    }

    #[tokio::test]
    async fn test_live_is_alive() {
        let Json(body) = live().await;
        assert_eq!(body.status, "alive");
    }
}
