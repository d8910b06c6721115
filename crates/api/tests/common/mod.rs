//! Common test utilities for integration tests.
//!
//! Builds the router against the in-memory pattern store and a scripted
//! reasoning service, so no database or network is needed.

// Helpers are shared across test binaries; not every binary uses all of them.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request},
    response::Response,
    Router,
};
use domain::services::{InMemoryPatternStore, MockReasoningService, PatternStore};
use fake::{faker::lorem::en::Word, Fake};
use powerguard_api::{
    app::create_app,
    config::{
        AdminConfig, Config, DatabaseConfig, LoggingConfig, OptimizerConfig, ReasoningConfig,
        ServerConfig, StorageConfig,
    },
};
use serde_json::{json, Value};

pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// Test configuration: memory storage, fast retries, admin enabled.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
            max_body_size_bytes: 2_097_152,
            cors_origins: vec![],
        },
        database: DatabaseConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        reasoning: ReasoningConfig {
            attempt_timeout_ms: 50,
            max_attempts: 2,
            base_delay_ms: 1,
            ..ReasoningConfig::default()
        },
        optimizer: OptimizerConfig::default(),
        admin: AdminConfig {
            api_key: TEST_ADMIN_KEY.to_string(),
        },
        storage: StorageConfig::default(),
    }
}

/// Router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryPatternStore>,
    pub reasoning: Arc<MockReasoningService>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub fn create_test_app_with(
    config: Config,
    store: InMemoryPatternStore,
    reasoning: MockReasoningService,
) -> TestApp {
    let store = Arc::new(store);
    let reasoning = Arc::new(reasoning);
    let router = create_app(
        config,
        store.clone() as Arc<dyn PatternStore>,
        reasoning.clone(),
    );
    TestApp {
        router,
        store,
        reasoning,
    }
}

/// App whose reasoning service always fails, so every answer comes from rules.
pub fn create_test_app() -> TestApp {
    create_test_app_with(
        test_config(),
        InMemoryPatternStore::new(),
        MockReasoningService::failing(),
    )
}

/// A random device id that passes validation.
pub fn random_device_id() -> String {
    let word: String = Word().fake();
    format!("pixel-{}-{}", word, uuid::Uuid::new_v4().simple())
}

/// One app record in wire format. Background time is half the foreground
/// time and all data is foreground.
pub fn app_json(package: &str, battery: f64, data_mb: f64, foreground_secs: f64) -> Value {
    let app_name = package.rsplit('.').next().unwrap_or(package);
    json!({
        "packageName": package,
        "appName": app_name,
        "isSystemApp": false,
        "lastUsed": 1_700_000_000,
        "foregroundTime": foreground_secs,
        "backgroundTime": foreground_secs / 2.0,
        "batteryUsage": battery,
        "dataUsage": { "foreground": data_mb, "background": 0.0, "rxBytes": 0, "txBytes": 0 },
        "memoryUsage": 150.0,
        "cpuUsage": 5.0,
        "notifications": 3,
        "crashes": 0
    })
}

/// Discharging phone on wifi with a navigation app, a heavy video app, a
/// game and one idle app.
pub fn snapshot_json(device_id: &str, battery_level: f64, prompt: Option<&str>) -> Value {
    let mut snapshot = json!({
        "deviceId": device_id,
        "timestamp": 1_700_000_000,
        "battery": {
            "level": battery_level,
            "temperature": 30.0,
            "voltage": 4000.0,
            "isCharging": false,
            "chargingType": "none",
            "health": 2,
            "capacity": 4500.0,
            "currentNow": 0.0
        },
        "memory": {
            "totalRam": 8_000_000_000.0,
            "availableRam": 3_000_000_000.0,
            "lowMemory": false,
            "threshold": 500_000_000.0
        },
        "cpu": { "usage": 40.0, "temperature": 38.0, "frequencies": [1800.0, 2400.0] },
        "network": {
            "type": "wifi",
            "strength": 3.0,
            "isRoaming": false,
            "dataUsage": { "foreground": 500.0, "background": 120.0, "rxBytes": 0, "txBytes": 0 },
            "cellularGeneration": ""
        },
        "apps": [
            app_json("com.google.android.apps.maps", 14.0, 30.0, 2400.0),
            app_json("com.video", 22.0, 650.0, 5400.0),
            app_json("com.game", 9.0, 40.0, 1800.0),
            app_json("com.idle", 0.0, 0.0, 0.0)
        ],
        "settings": {
            "powerSaveMode": false,
            "dataSaver": false,
            "batteryOptimization": true,
            "adaptiveBattery": true,
            "autoSync": true
        }
    });
    if let Some(prompt) = prompt {
        snapshot["prompt"] = json!(prompt);
    }
    snapshot
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn raw_json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn admin_request(method: Method, uri: &str, admin_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = admin_key {
        builder = builder.header("X-Admin-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn parse_response_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

/// Posts a snapshot to the analysis endpoint and returns the JSON body.
pub async fn analyze(app: &TestApp, snapshot: &Value) -> Value {
    let response = app
        .send(json_request(Method::POST, "/api/v1/analyze", snapshot))
        .await;
    assert_eq!(response.status(), 200);
    parse_response_body(response).await
}
