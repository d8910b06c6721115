//! Integration tests for health probes and the metrics endpoint.
//!
//! Run with: cargo test --test health_integration

mod common;

use axum::body::to_bytes;
use axum::http::StatusCode;
use common::{
    analyze, create_test_app, create_test_app_with, get_request, parse_response_body,
    random_device_id, snapshot_json, test_config,
};
use domain::services::{InMemoryPatternStore, MockReasoningService};

#[tokio::test]
async fn test_health_check_reports_store() {
    let app = create_test_app();

    let response = app.send(get_request("/api/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["pattern_store"]["backend"], "memory");
    assert_eq!(body["pattern_store"]["connected"], true);
    assert_eq!(body["reasoning"]["enabled"], false);
}

#[tokio::test]
async fn test_health_check_degraded_when_store_down() {
    let app = create_test_app_with(
        test_config(),
        InMemoryPatternStore::failing(),
        MockReasoningService::failing(),
    );

    let response = app.send(get_request("/api/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert!(body["pattern_store"]["latency_ms"].is_null());
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let app = create_test_app();

    let response = app.send(get_request("/api/health/live")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get_request("/api/health/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_readiness_fails_when_store_down() {
    let app = create_test_app_with(
        test_config(),
        InMemoryPatternStore::failing(),
        MockReasoningService::failing(),
    );

    let response = app.send(get_request("/api/health/ready")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    powerguard_api::middleware::init_metrics().unwrap();
    let app = create_test_app();
    analyze(&app, &snapshot_json(&random_device_id(), 38.0, Some("Save my battery"))).await;

    let response = app.send(get_request("/metrics")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("analysis_requests_total"));
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_test_app();

    let response = app.send(get_request("/api/v2/analyze")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
