//! Reasoning service capability.
//!
//! The natural-language reasoning service is an opaque collaborator with two
//! operations: classify a prompt, and generate recommendations for a device.
//! Every call goes through a [`RetryPolicy`] that bounds each attempt with a
//! timeout and backs off exponentially between attempts.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{DeviceSnapshot, IntentCategory, ResourceFocus, Tier};

/// Errors from a reasoning-service call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReasoningError {
    #[error("Reasoning service is disabled")]
    Disabled,

    #[error("Reasoning request timed out after {0}ms")]
    Timeout(u64),

    #[error("Reasoning HTTP error: {0}")]
    Http(String),

    #[error("Reasoning service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed reasoning response: {0}")]
    Malformed(String),
}

impl ReasoningError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReasoningError::Disabled => false,
            ReasoningError::Status { status, .. } => *status == 429 || *status >= 500,
            ReasoningError::Timeout(_)
            | ReasoningError::Http(_)
            | ReasoningError::Malformed(_) => true,
        }
    }

    /// Short label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReasoningError::Disabled => "disabled",
            ReasoningError::Timeout(_) => "timeout",
            ReasoningError::Http(_) => "http",
            ReasoningError::Status { .. } => "status",
            ReasoningError::Malformed(_) => "malformed",
        }
    }
}

/// Input for prompt classification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    pub device_id: String,
    pub prompt: String,
}

impl ClassificationRequest {
    /// Instruction text sent to the model.
    pub fn instructions(&self) -> String {
        format!(
            "Classify the user's request about their Android phone.\n\
             Resource focus, exactly one of: BATTERY, DATA, OTHER.\n\
             Intent category, exactly one of:\n\
             1 information (asks for current usage facts)\n\
             2 predictive (asks whether something will last or be possible)\n\
             3 optimization (asks to save or extend a resource)\n\
             4 monitoring (asks to be alerted when something happens)\n\
             5 pattern_analysis (asks about historical usage patterns)\n\
             6 invalid (unrelated to battery or data)\n\
             Respond with JSON only: {{\"resourceType\": \"BATTERY\", \"queryCategory\": 3}}\n\
             User request: {}",
            self.prompt
        )
    }
}

/// Classification returned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelClassification {
    pub focus: ResourceFocus,
    pub intent: IntentCategory,
}

impl ModelClassification {
    /// Parses the model's reply. Tolerates prose around the JSON object,
    /// symbolic or numeric categories, and snake_case keys.
    pub fn parse(raw: &str) -> Result<Self, ReasoningError> {
        let value = extract_json_object(raw)?;

        let focus = string_field(&value, &["resourceType", "resource_type", "focus"])
            .and_then(|s| ResourceFocus::parse(&s))
            .ok_or_else(|| ReasoningError::Malformed("missing or unknown resourceType".into()))?;

        let intent = match field(&value, &["queryCategory", "query_category", "intent"]) {
            Some(Value::Number(n)) => n.as_u64().and_then(IntentCategory::from_code),
            Some(Value::String(s)) => IntentCategory::parse(s),
            _ => None,
        }
        .ok_or_else(|| ReasoningError::Malformed("missing or unknown queryCategory".into()))?;

        Ok(Self { focus, intent })
    }
}

/// Input for model-generated recommendations.
#[derive(Debug, Clone)]
pub struct RecommendationRequest<'a> {
    pub snapshot: &'a DeviceSnapshot,
    pub prompt: &'a str,
    pub focus: ResourceFocus,
    pub intent: IntentCategory,
    pub tier: Tier,
    pub protected_packages: Vec<String>,
    pub history: &'a BTreeMap<String, String>,
}

impl RecommendationRequest<'_> {
    /// Instruction text sent to the model, including a compact device
    /// summary and the expected response shape.
    pub fn instructions(&self) -> String {
        let mut apps: Vec<String> = self
            .snapshot
            .apps
            .iter()
            .take(25)
            .map(|app| {
                let mut line = format!(
                    "- {} ({}): battery {:.1}%, data {:.1} MB, foreground {:.0} min",
                    app.display_name(),
                    app.package_name,
                    app.battery_percent(),
                    app.data_mb(),
                    app.foreground_time / 60.0
                );
                if let Some(pattern) = self.history.get(&app.package_name) {
                    line.push_str(&format!(", history: {}", pattern));
                }
                line
            })
            .collect();
        if apps.is_empty() {
            apps.push("- none".to_string());
        }

        let protected = if self.protected_packages.is_empty() {
            "none".to_string()
        } else {
            self.protected_packages.join(", ")
        };

        format!(
            "You optimize Android battery and data usage.\n\
             User request: {prompt}\n\
             Resource focus: {focus}. Intent: {intent}. Strategy tier: {tier}.\n\
             Battery: {level:.0}% (charging: {charging}). Network: {network}.\n\
             Apps:\n{apps}\n\
             Never restrict these packages: {protected}.\n\
             Allowed action types: SET_STANDBY_BUCKET, RESTRICT_BACKGROUND_DATA, KILL_APP, \
             MANAGE_WAKE_LOCKS, THROTTLE_CPU_USAGE, ENABLE_BATTERY_SAVER, ENABLE_DATA_SAVER, \
             ADJUST_SYNC_SETTINGS.\n\
             Respond with JSON only: {{\"actionable\": [{{\"type\": \"...\", \"packageName\": \"...\", \
             \"description\": \"...\", \"reason\": \"...\", \"newMode\": \"...\", \"parameters\": {{}}}}], \
             \"insights\": [{{\"type\": \"...\", \"title\": \"...\", \"description\": \"...\", \
             \"severity\": \"info|low|medium|high|critical\"}}], \"batteryScore\": 0-100, \
             \"dataScore\": 0-100, \"performanceScore\": 0-100, \
             \"estimatedSavings\": {{\"batteryMinutes\": 0, \"dataMB\": 0}}}}",
            prompt = self.prompt,
            focus = self.focus,
            intent = self.intent,
            tier = self.tier,
            level = self.snapshot.battery.level,
            charging = self.snapshot.battery.is_charging,
            network = self.snapshot.network.network_type,
            apps = apps.join("\n"),
            protected = protected,
        )
    }
}

/// Natural-language reasoning capability.
#[async_trait::async_trait]
pub trait ReasoningService: Send + Sync {
    /// Classify a prompt into a resource focus and intent category.
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ModelClassification, ReasoningError>;

    /// Generate recommendations. The result is untrusted JSON that must be
    /// repaired by the response assembler before use.
    async fn recommend(
        &self,
        request: &RecommendationRequest<'_>,
    ) -> Result<Value, ReasoningError>;
}

/// Bounded retry with per-attempt timeout and exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        self.base_delay.mul_f64(self.multiplier.max(1.0).powi(exponent))
    }

    /// Worst-case wall time of [`RetryPolicy::run`].
    pub fn budget(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let waits: Duration = (1..attempts).map(|retry| self.delay_for(retry)).sum();
        self.attempt_timeout * attempts + waits
    }

    /// Runs `call` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent. Returns the last error.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, ReasoningError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReasoningError>>,
    {
        let attempts = self.max_attempts.max(1);
        let timeout_ms = self.attempt_timeout.as_millis() as u64;
        let mut last_error = ReasoningError::Timeout(timeout_ms);

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.delay_for(attempt)).await;
            }

            let error = match tokio::time::timeout(self.attempt_timeout, call()).await {
                Ok(Ok(value)) => {
                    counter!("reasoning_calls_total", "operation" => operation, "outcome" => "ok")
                        .increment(1);
                    debug!(operation, attempt = attempt + 1, "Reasoning call succeeded");
                    return Ok(value);
                }
                Ok(Err(error)) => error,
                Err(_) => ReasoningError::Timeout(timeout_ms),
            };

            counter!(
                "reasoning_calls_total",
                "operation" => operation,
                "outcome" => error.kind()
            )
            .increment(1);

            if !error.is_retryable() {
                return Err(error);
            }

            warn!(
                operation,
                attempt = attempt + 1,
                max_attempts = attempts,
                error = %error,
                "Reasoning call failed"
            );
            last_error = error;
        }

        Err(last_error)
    }
}

/// Reasoning service used when no provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledReasoningService;

#[async_trait::async_trait]
impl ReasoningService for DisabledReasoningService {
    async fn classify(
        &self,
        _request: &ClassificationRequest,
    ) -> Result<ModelClassification, ReasoningError> {
        Err(ReasoningError::Disabled)
    }

    async fn recommend(
        &self,
        _request: &RecommendationRequest<'_>,
    ) -> Result<Value, ReasoningError> {
        Err(ReasoningError::Disabled)
    }
}

/// Scripted reasoning service for development and testing.
#[derive(Debug, Default)]
pub struct MockReasoningService {
    classification: Option<Result<ModelClassification, ReasoningError>>,
    recommendation: Option<Result<Value, ReasoningError>>,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl MockReasoningService {
    /// Create a mock that classifies every prompt as balanced optimization
    /// and has no recommendations.
    pub fn new() -> Self {
        Self {
            classification: Some(Ok(ModelClassification {
                focus: ResourceFocus::Other,
                intent: IntentCategory::Optimization,
            })),
            ..Default::default()
        }
    }

    /// Create a mock that fails every call with a retryable transport error.
    pub fn failing() -> Self {
        Self {
            classification: Some(Err(ReasoningError::Http("simulated failure".into()))),
            recommendation: Some(Err(ReasoningError::Http("simulated failure".into()))),
            ..Default::default()
        }
    }

    /// Create a mock whose every call outlives any reasonable timeout.
    pub fn hanging() -> Self {
        Self {
            delay: Some(Duration::from_secs(3600)),
            ..Self::new()
        }
    }

    /// Create a mock that answers with unparsable text.
    pub fn garbled() -> Self {
        Self {
            classification: Some(ModelClassification::parse("I think it is about phones.")),
            recommendation: Some(Ok(Value::String("not json".into()))),
            ..Default::default()
        }
    }

    pub fn with_classification(mut self, focus: ResourceFocus, intent: IntentCategory) -> Self {
        self.classification = Some(Ok(ModelClassification { focus, intent }));
        self
    }

    pub fn with_recommendation(mut self, value: Value) -> Self {
        self.recommendation = Some(Ok(value));
        self
    }

    /// Total calls made to either operation.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl ReasoningService for MockReasoningService {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ModelClassification, ReasoningError> {
        self.begin_call().await;
        debug!(device_id = %request.device_id, "Mock: classify");
        self.classification
            .clone()
            .unwrap_or(Err(ReasoningError::Disabled))
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest<'_>,
    ) -> Result<Value, ReasoningError> {
        self.begin_call().await;
        debug!(device_id = %request.snapshot.device_id, "Mock: recommend");
        self.recommendation
            .clone()
            .unwrap_or(Err(ReasoningError::Disabled))
    }
}

/// Pulls the first JSON object out of model text, which may wrap it in
/// prose or a fenced code block.
pub fn extract_json_object(raw: &str) -> Result<Value, ReasoningError> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(value);
    }

    let start = raw
        .find('{')
        .ok_or_else(|| ReasoningError::Malformed("no JSON object in response".into()))?;
    let end = raw
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ReasoningError::Malformed("unterminated JSON object".into()))?;

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ReasoningError::Malformed("response is not a JSON object".into())),
        Err(e) => Err(ReasoningError::Malformed(e.to_string())),
    }
}

fn field<'v>(value: &'v Value, keys: &[&str]) -> Option<&'v Value> {
    keys.iter().find_map(|key| value.get(*key))
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    field(value, keys).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            attempt_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_parse_model_classification_numeric() {
        let parsed =
            ModelClassification::parse(r#"{"resourceType": "DATA", "queryCategory": 1}"#).unwrap();
        assert_eq!(parsed.focus, ResourceFocus::Data);
        assert_eq!(parsed.intent, IntentCategory::Information);
    }

    #[test]
    fn test_parse_model_classification_wrapped_in_prose() {
        let raw = "Sure! ```json\n{\"resource_type\": \"battery\", \"query_category\": \"monitoring\"}\n```";
        let parsed = ModelClassification::parse(raw).unwrap();
        assert_eq!(parsed.focus, ResourceFocus::Battery);
        assert_eq!(parsed.intent, IntentCategory::Monitoring);
    }

    #[test]
    fn test_parse_model_classification_rejects_unknown_values() {
        let err = ModelClassification::parse(r#"{"resourceType": "STORAGE", "queryCategory": 3}"#)
            .unwrap_err();
        assert!(matches!(err, ReasoningError::Malformed(_)));

        let err = ModelClassification::parse(r#"{"resourceType": "DATA", "queryCategory": 9}"#)
            .unwrap_err();
        assert!(matches!(err, ReasoningError::Malformed(_)));
    }

    #[test]
    fn test_extract_json_object_without_json() {
        assert!(extract_json_object("no braces here").is_err());
        assert!(extract_json_object("} backwards {").is_err());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ReasoningError::Timeout(10).is_retryable());
        assert!(ReasoningError::Malformed("x".into()).is_retryable());
        assert!(ReasoningError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(ReasoningError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!ReasoningError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!ReasoningError::Disabled.is_retryable());
    }

    #[test]
    fn test_backoff_doubles_from_base_delay() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.budget(), Duration::from_millis(3_300));
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fast_policy(3)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ReasoningError::Http("flaky".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_non_retryable_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = fast_policy(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ReasoningError::Disabled)
            })
            .await;
        assert_eq!(result, Err(ReasoningError::Disabled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_times_out_each_attempt() {
        let service = MockReasoningService::hanging();
        let request = ClassificationRequest {
            device_id: "device-1".into(),
            prompt: "hello".into(),
        };
        let started = std::time::Instant::now();
        let result = fast_policy(2).run("classify", || service.classify(&request)).await;
        assert_eq!(result, Err(ReasoningError::Timeout(50)));
        assert_eq!(service.calls(), 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_garbled_mock_reports_malformed() {
        let service = MockReasoningService::garbled();
        let request = ClassificationRequest {
            device_id: "device-1".into(),
            prompt: "hello".into(),
        };
        let result = service.classify(&request).await;
        assert!(matches!(result, Err(ReasoningError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_disabled_service() {
        let request = ClassificationRequest {
            device_id: "device-1".into(),
            prompt: "hello".into(),
        };
        let result = DisabledReasoningService.classify(&request).await;
        assert_eq!(result, Err(ReasoningError::Disabled));
    }

    #[test]
    fn test_classification_instructions_include_prompt() {
        let request = ClassificationRequest {
            device_id: "device-1".into(),
            prompt: "Will my battery last?".into(),
        };
        let text = request.instructions();
        assert!(text.contains("Will my battery last?"));
        assert!(text.contains("queryCategory"));
    }
}
