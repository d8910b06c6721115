use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::catalog::OptimizerCatalog;
use domain::services::{AnalysisPipeline, PatternStore, ReasoningService};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, StorageBackend};
use crate::middleware::{metrics_handler, metrics_middleware, require_admin, trace_id};
use crate::routes::{admin, analysis, health, patterns};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: AnalysisPipeline,
    pub patterns: Arc<dyn PatternStore>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        patterns: Arc<dyn PatternStore>,
        reasoning: Arc<dyn ReasoningService>,
    ) -> Self {
        let pipeline = AnalysisPipeline::new(
            Arc::new(OptimizerCatalog::standard()),
            reasoning,
            patterns.clone(),
            config.reasoning.retry_policy(),
            config.optimizer.drain_model(),
        );
        Self {
            config,
            pipeline,
            patterns,
        }
    }

    pub fn storage_backend(&self) -> &'static str {
        match self.config.storage.backend {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

pub fn create_app(
    config: Config,
    patterns: Arc<dyn PatternStore>,
    reasoning: Arc<dyn ReasoningService>,
) -> Router {
    let config = Arc::new(config);
    let state = AppState::new(config.clone(), patterns, reasoning);

    // Build CORS layer based on configuration
    let cors = if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Analysis and pattern lookup (v1 plus legacy unversioned paths)
    let api_routes = Router::new()
        .route("/api/v1/analyze", post(analysis::analyze))
        .route("/api/v1/patterns/:device_id", get(patterns::get_device_patterns))
        .route("/api/analyze", post(analysis::analyze))
        .route("/api/patterns/:device_id", get(patterns::get_device_patterns));

    // Admin routes (require X-Admin-Key)
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/patterns",
            get(admin::list_patterns).delete(admin::reset_patterns),
        )
        .route("/api/reset-db", post(admin::reset_patterns))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size_bytes))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
