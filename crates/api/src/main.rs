use std::sync::Arc;

use anyhow::{Context, Result};
use domain::services::{DisabledReasoningService, InMemoryPatternStore, PatternStore, ReasoningService};
use persistence::UsagePatternRepository;
use powerguard_api::{
    app,
    config::{Config, StorageBackend},
    middleware,
    services::ChatCompletionsClient,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics().context("Failed to install Prometheus recorder")?;

    info!("Starting PowerGuard API v{}", env!("CARGO_PKG_VERSION"));

    let patterns: Arc<dyn PatternStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let db_config: persistence::DatabaseConfig = (&config.database).into();
            let pool = persistence::create_pool(&db_config)
                .await
                .context("Failed to connect to the pattern store database")?;

            info!("Running database migrations...");
            persistence::run_migrations(&pool).await?;
            info!("Migrations completed");

            Arc::new(UsagePatternRepository::new(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory pattern store; patterns are lost on restart");
            Arc::new(InMemoryPatternStore::new())
        }
    };

    let reasoning: Arc<dyn ReasoningService> = if config.reasoning.enabled {
        info!(
            model = %config.reasoning.model,
            base_url = %config.reasoning.base_url,
            "Reasoning service enabled"
        );
        Arc::new(ChatCompletionsClient::new(&config.reasoning)?)
    } else {
        info!("Reasoning service disabled; using rule-based analysis only");
        Arc::new(DisabledReasoningService)
    };

    if config.reasoning_budget_exceeds_timeout() {
        warn!(
            budget_ms = config.reasoning.request_budget().as_millis() as u64,
            request_timeout_secs = config.server.request_timeout_secs,
            "Reasoning retry budget exceeds the request timeout"
        );
    }

    let addr = config.socket_addr().context("Invalid server address")?;
    let app = app::create_app(config, patterns, reasoning);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
