use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

use domain::services::{DrainModel, RetryPolicy};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size_bytes: usize,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl From<&DatabaseConfig> for persistence::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// OpenAI-compatible chat-completions provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_reasoning_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_reasoning_base_url(),
            api_key: String::new(),
            model: default_reasoning_model(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ReasoningConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.backoff_multiplier,
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
        }
    }

    /// Longest one analysis can wait on the reasoning service: a
    /// classification call and then a recommendation call, each run under
    /// the full retry policy.
    pub fn request_budget(&self) -> Duration {
        self.retry_policy().budget() * 2
    }
}

/// Fallback rates for the strategy selector.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_drain_percent_per_hour")]
    pub default_drain_percent_per_hour: f64,

    #[serde(default = "default_reserve_battery_percent")]
    pub reserve_battery_percent: f64,

    #[serde(default = "default_data_mb_per_hour")]
    pub default_data_mb_per_hour: f64,

    #[serde(default = "default_usage_window_hours")]
    pub usage_window_hours: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            default_drain_percent_per_hour: default_drain_percent_per_hour(),
            reserve_battery_percent: default_reserve_battery_percent(),
            default_data_mb_per_hour: default_data_mb_per_hour(),
            usage_window_hours: default_usage_window_hours(),
        }
    }
}

impl OptimizerConfig {
    pub fn drain_model(&self) -> DrainModel {
        DrainModel {
            default_drain_percent_per_hour: self.default_drain_percent_per_hour,
            reserve_battery_percent: self.reserve_battery_percent,
            default_data_mb_per_hour: self.default_data_mb_per_hour,
            usage_window_hours: self.usage_window_hours,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Shared secret for admin routes. Empty disables them.
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    #[default]
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_request_timeout() -> u64 {
    90
}
fn default_max_body_size() -> usize {
    2_097_152
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_reasoning_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_reasoning_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_attempt_timeout_ms() -> u64 {
    10_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_drain_percent_per_hour() -> f64 {
    10.0
}
fn default_reserve_battery_percent() -> f64 {
    10.0
}
fn default_data_mb_per_hour() -> f64 {
    50.0
}
fn default_usage_window_hours() -> f64 {
    24.0
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with PG__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("PG")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration from embedded defaults plus overrides, without
    /// touching the filesystem or environment.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8000
            request_timeout_secs = 30
            max_body_size_bytes = 2097152
            cors_origins = []

            [logging]
            level = "info"
            format = "pretty"

            [reasoning]
            enabled = false

            [admin]
            api_key = "test-admin-key"

            [storage]
            backend = "memory"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(ConfigValidationError::InvalidValue(format!(
                "logging.format must be json or pretty, got {}",
                self.logging.format
            )));
        }

        if self.storage.backend == StorageBackend::Postgres {
            if self.database.url.is_empty() {
                return Err(ConfigValidationError::MissingRequired(
                    "PG__DATABASE__URL must be set when storage.backend is postgres".to_string(),
                ));
            }
            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigValidationError::InvalidValue(
                    "min_connections cannot exceed max_connections".to_string(),
                ));
            }
        }

        let reasoning = &self.reasoning;
        if reasoning.max_attempts == 0 || reasoning.max_attempts > 5 {
            return Err(ConfigValidationError::InvalidValue(
                "reasoning.max_attempts must be between 1 and 5".to_string(),
            ));
        }
        if reasoning.backoff_multiplier < 1.0 {
            return Err(ConfigValidationError::InvalidValue(
                "reasoning.backoff_multiplier must be at least 1".to_string(),
            ));
        }
        if reasoning.attempt_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "reasoning.attempt_timeout_ms must be positive".to_string(),
            ));
        }
        if reasoning.enabled && reasoning.api_key.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "PG__REASONING__API_KEY must be set when reasoning is enabled".to_string(),
            ));
        }

        let optimizer = &self.optimizer;
        if optimizer.default_drain_percent_per_hour <= 0.0
            || optimizer.default_data_mb_per_hour <= 0.0
            || optimizer.usage_window_hours <= 0.0
        {
            return Err(ConfigValidationError::InvalidValue(
                "optimizer rates and usage window must be positive".to_string(),
            ));
        }
        if !(0.0..100.0).contains(&optimizer.reserve_battery_percent) {
            return Err(ConfigValidationError::InvalidValue(
                "optimizer.reserve_battery_percent must be in [0, 100)".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    /// Whether reasoning retries can outlast the HTTP request timeout.
    pub fn reasoning_budget_exceeds_timeout(&self) -> bool {
        self.reasoning.enabled
            && self.reasoning.request_budget() >= Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Admin routes are enabled only when a key is configured.
    pub fn admin_enabled(&self) -> bool {
        !self.admin.api_key.is_empty()
    }
}
