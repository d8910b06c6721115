//! Analysis pipeline.
//!
//! Runs one request through every stage: normalize, read history, classify,
//! extract constraints, select a strategy, generate actions and insights,
//! assemble, then record patterns. Only the reasoning service and the
//! pattern store can fail, and neither failure aborts the request.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::catalog::OptimizerCatalog;
use crate::models::{
    AnalysisResponse, ClassificationSource, DeviceSnapshot, Insight, IntentCategory,
    PromptClassification, ResponseType, Severity, Strategy,
};
use crate::services::actionable_generator::{generate_actionables, rank_apps};
use crate::services::assembler::{assemble, AssemblyContext, DraftAnalysis};
use crate::services::classifier::classify;
use crate::services::constraint_extractor::extract_constraints;
use crate::services::insight_generator::{estimate_savings, generate_insights, InsightContext};
use crate::services::normalizer::{normalize, NormalizedSnapshot};
use crate::services::pattern_store::PatternStore;
use crate::services::pattern_summary::patterns_for;
use crate::services::reasoning::{ReasoningService, RecommendationRequest, RetryPolicy};
use crate::services::scoring::score_snapshot;
use crate::services::strategy_selector::{select_strategy, DrainModel};

const FALLBACK_SUFFIX: &str = " (rule-based fallback)";

/// Orchestrates the analysis stages around shared, read-only collaborators.
#[derive(Clone)]
pub struct AnalysisPipeline {
    catalog: Arc<OptimizerCatalog>,
    reasoning: Arc<dyn ReasoningService>,
    patterns: Arc<dyn PatternStore>,
    retry: RetryPolicy,
    drain: DrainModel,
}

impl AnalysisPipeline {
    pub fn new(
        catalog: Arc<OptimizerCatalog>,
        reasoning: Arc<dyn ReasoningService>,
        patterns: Arc<dyn PatternStore>,
        retry: RetryPolicy,
        drain: DrainModel,
    ) -> Self {
        Self {
            catalog,
            reasoning,
            patterns,
            retry,
            drain,
        }
    }

    /// Analyzes one snapshot. Always returns a well-formed response.
    pub async fn analyze(&self, snapshot: DeviceSnapshot) -> AnalysisResponse {
        let snapshot = normalize(snapshot);
        let now = Utc::now().timestamp();

        if !snapshot.has_apps() {
            warn!(
                device_id = %snapshot.device_id,
                dropped_apps = snapshot.dropped_apps(),
                "Snapshot has no usable apps"
            );
            return no_usable_apps(now);
        }

        let device_id = snapshot.device_id.as_str();
        let prompt = snapshot.prompt();
        let catalog = self.catalog.as_ref();

        let history = match self.patterns.get_patterns(device_id).await {
            Ok(history) => history,
            Err(error) => {
                warn!(device_id, error = %error, "Failed to read usage patterns");
                BTreeMap::new()
            }
        };

        let outcome = classify(prompt, device_id, catalog, self.reasoning.as_ref(), &self.retry).await;
        let classification = outcome.classification;

        let constraints = extract_constraints(prompt, &classification, catalog);
        let strategy = select_strategy(&snapshot, &constraints, &self.drain, catalog);

        let ranked = rank_apps(&snapshot.apps, classification.focus);
        let actions = generate_actionables(
            &ranked,
            &strategy,
            &classification,
            snapshot.settings.as_ref(),
            catalog,
        );
        let insights = generate_insights(&InsightContext {
            snapshot: &snapshot,
            prompt,
            classification: &classification,
            constraints: &constraints,
            strategy: &strategy,
            ranked: &ranked,
            actions: &actions,
            history: &history,
            drain: &self.drain,
            catalog,
        });
        let scores = score_snapshot(&snapshot);
        let savings = estimate_savings(&actions, &strategy, catalog);

        let rule_draft = DraftAnalysis::from_generated(&actions, &insights, scores, savings);
        let draft = if classification.source == ClassificationSource::Model
            && classification.intent.produces_actions()
        {
            self.model_draft(&snapshot, &classification, &strategy, &history, rule_draft)
                .await
        } else {
            rule_draft
        };

        let mut message = response_message(&classification, &strategy, draft.actionable.len());
        if outcome.degraded {
            message.push_str(FALLBACK_SUFFIX);
        }

        let (response, report) = assemble(
            draft,
            AssemblyContext {
                intent: classification.intent,
                protected_packages: &strategy.protected_packages,
                savings_cap: Some(strategy.targets),
                success: true,
                message,
                response_type: classification.intent.into(),
                timestamp: now,
            },
        );

        self.record_patterns(&snapshot, &strategy, now).await;

        info!(
            device_id,
            focus = %classification.focus,
            intent = %classification.intent,
            tier = %strategy.tier,
            actions = response.actionable.len(),
            insights = response.insights.len(),
            repaired = !report.is_clean(),
            degraded = outcome.degraded,
            "Analysis complete"
        );

        response
    }

    /// Asks the reasoning service for content. Any section the model leaves
    /// empty or omits is taken from the rule draft.
    async fn model_draft(
        &self,
        snapshot: &NormalizedSnapshot,
        classification: &PromptClassification,
        strategy: &Strategy,
        history: &BTreeMap<String, String>,
        rules: DraftAnalysis,
    ) -> DraftAnalysis {
        let request = RecommendationRequest {
            snapshot,
            prompt: snapshot.prompt().unwrap_or_default(),
            focus: classification.focus,
            intent: classification.intent,
            tier: strategy.tier,
            protected_packages: strategy.protected_packages.iter().cloned().collect(),
            history,
        };

        match self
            .retry
            .run("recommend", || self.reasoning.recommend(&request))
            .await
        {
            Ok(value) => {
                let model = DraftAnalysis::from_value(&value);
                DraftAnalysis {
                    actionable: if model.actionable.is_empty() {
                        rules.actionable
                    } else {
                        model.actionable
                    },
                    insights: if model.insights.is_empty() {
                        rules.insights
                    } else {
                        model.insights
                    },
                    battery_score: model.battery_score.or(rules.battery_score),
                    data_score: model.data_score.or(rules.data_score),
                    performance_score: model.performance_score.or(rules.performance_score),
                    battery_minutes: model.battery_minutes.or(rules.battery_minutes),
                    data_mb: model.data_mb.or(rules.data_mb),
                }
            }
            Err(error) => {
                warn!(
                    device_id = %snapshot.device_id,
                    error = %error,
                    "Reasoning service recommendations failed, using rule output"
                );
                rules
            }
        }
    }

    async fn record_patterns(&self, snapshot: &NormalizedSnapshot, strategy: &Strategy, now: i64) {
        let rows = patterns_for(
            &snapshot.device_id,
            now,
            snapshot
                .apps
                .iter()
                .map(|app| (app, strategy.is_protected(&app.package_name))),
        );
        if let Err(error) = self.patterns.upsert_patterns(&rows).await {
            warn!(
                device_id = %snapshot.device_id,
                error = %error,
                "Failed to store usage patterns"
            );
        }
    }
}

fn response_message(
    classification: &PromptClassification,
    strategy: &Strategy,
    action_count: usize,
) -> String {
    match classification.intent {
        IntentCategory::Information => format!("Current {} usage", focus_noun(classification)),
        IntentCategory::Predictive => "Usage prediction based on the current device state".to_string(),
        IntentCategory::Optimization => format!(
            "{} optimization plan with {} recommended action{}",
            capitalize(strategy.tier.label()),
            action_count,
            plural(action_count)
        ),
        IntentCategory::Monitoring => format!(
            "Monitoring {} usage with {} recommended action{}",
            focus_noun(classification),
            action_count,
            plural(action_count)
        ),
        IntentCategory::PatternAnalysis => "Usage pattern analysis".to_string(),
        IntentCategory::Invalid => "Request is not about battery or data usage".to_string(),
    }
}

fn focus_noun(classification: &PromptClassification) -> &'static str {
    match classification.focus {
        crate::models::ResourceFocus::Battery => "battery",
        crate::models::ResourceFocus::Data => "data",
        crate::models::ResourceFocus::Other => "battery and data",
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Minimal failed response for a snapshot with nothing to analyze.
fn no_usable_apps(now: i64) -> AnalysisResponse {
    let insight = Insight::new(
        "DataError",
        "No usable app data",
        "The snapshot did not contain any app with measurable battery, data or screen time, \
         so no analysis could be made.",
        Severity::High,
    );
    let protected = Default::default();
    let (response, _) = assemble(
        DraftAnalysis {
            insights: vec![(&insight).into()],
            ..Default::default()
        },
        AssemblyContext {
            intent: IntentCategory::Invalid,
            protected_packages: &protected,
            savings_cap: None,
            success: false,
            message: "No usable app usage data in snapshot".to_string(),
            response_type: ResponseType::Error,
            timestamp: now,
        },
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionType, ResourceFocus};
    use crate::services::pattern_store::InMemoryPatternStore;
    use crate::services::reasoning::MockReasoningService;
    use crate::test_fixtures::{app, with_apps};
    use serde_json::json;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            attempt_timeout: Duration::from_millis(30),
        }
    }

    fn pipeline(
        reasoning: Arc<dyn ReasoningService>,
        store: Arc<InMemoryPatternStore>,
    ) -> AnalysisPipeline {
        AnalysisPipeline::new(
            Arc::new(OptimizerCatalog::standard()),
            reasoning,
            store,
            fast_retry(),
            DrainModel::default(),
        )
    }

    fn device(level: f64, prompt: Option<&str>) -> DeviceSnapshot {
        let mut snapshot = with_apps(
            level,
            vec![
                app("com.google.android.apps.maps", 14.0, 30.0, 2400.0),
                app("com.video", 22.0, 650.0, 5400.0),
                app("com.game", 9.0, 40.0, 1800.0),
                app("com.idle", 0.0, 0.0, 0.0),
            ],
        );
        snapshot.prompt = prompt.map(str::to_string);
        snapshot
    }

    fn assert_well_formed(response: &AnalysisResponse) {
        for score in [
            response.battery_score,
            response.data_score,
            response.performance_score,
        ] {
            assert!((0.0..=100.0).contains(&score));
        }
        assert!(response.estimated_savings.battery_minutes >= 0.0);
        assert!(response.estimated_savings.data_mb >= 0.0);
        assert!(response.actionable.iter().all(|a| a.action_type().is_some()));
        assert!(response.insights.iter().all(|i| !i.description.is_empty()));
    }

    #[tokio::test]
    async fn test_no_prompt_at_low_battery_is_very_aggressive() {
        let store = Arc::new(InMemoryPatternStore::new());
        let response = pipeline(Arc::new(MockReasoningService::failing()), store)
            .analyze(device(8.0, None))
            .await;

        assert!(response.success);
        assert_eq!(response.response_type, ResponseType::Optimization);
        assert!(response.message.starts_with("Very aggressive"));
        assert!(response
            .actionable
            .iter()
            .any(|a| a.action_type() == Some(ActionType::EnableBatterySaver)));
        assert_well_formed(&response);
    }

    #[tokio::test]
    async fn test_save_my_battery_produces_actions_and_insights() {
        let store = Arc::new(InMemoryPatternStore::new());
        let response = pipeline(Arc::new(MockReasoningService::failing()), store)
            .analyze(device(38.0, Some("Save my battery")))
            .await;

        assert!(response.success);
        assert!(!response.actionable.is_empty());
        assert!(response.actionable.iter().any(|a| !a.is_system_wide()));
        assert!(!response.insights.is_empty());
        assert_well_formed(&response);
    }

    #[tokio::test]
    async fn test_information_request_has_no_actions() {
        let store = Arc::new(InMemoryPatternStore::new());
        let response = pipeline(Arc::new(MockReasoningService::failing()), store)
            .analyze(device(5.0, Some("What apps are using the most battery?")))
            .await;

        assert!(response.success);
        assert!(response.actionable.is_empty());
        assert!(!response.insights.is_empty());
        assert_eq!(response.response_type, ResponseType::Information);
    }

    #[tokio::test]
    async fn test_protected_maps_kept_while_others_restricted() {
        let store = Arc::new(InMemoryPatternStore::new());
        let response = pipeline(Arc::new(MockReasoningService::failing()), store)
            .analyze(device(45.0, Some("I need maps for 3 hours")))
            .await;

        let maps = response
            .actionable
            .iter()
            .find(|a| a.package_name == "com.google.android.apps.maps")
            .unwrap();
        assert!(!maps.payload.is_restrictive());
        assert!(response
            .actionable
            .iter()
            .any(|a| a.package_name == "com.video" && a.payload.is_restrictive()));
        assert!(response
            .insights
            .iter()
            .any(|i| i.insight_type == "ProtectedApps"));
    }

    #[tokio::test]
    async fn test_classification_timeout_falls_back() {
        let store = Arc::new(InMemoryPatternStore::new());
        let reasoning = Arc::new(MockReasoningService::hanging());
        let started = std::time::Instant::now();
        let response = pipeline(reasoning.clone(), store)
            .analyze(device(60.0, Some("hmm")))
            .await;

        assert!(response.success);
        assert!(response.message.ends_with(FALLBACK_SUFFIX));
        assert_eq!(reasoning.calls(), 2);
        assert!(started.elapsed() < fast_retry().budget() + Duration::from_secs(1));
        assert_well_formed(&response);
    }

    #[tokio::test]
    async fn test_model_recommendations_are_repaired() {
        let store = Arc::new(InMemoryPatternStore::new());
        let reasoning = MockReasoningService::new()
            .with_classification(ResourceFocus::Battery, IntentCategory::Optimization)
            .with_recommendation(json!({
                "actionable": [
                    {"type": "FREEZE_APP", "packageName": "com.video", "description": "Freeze"},
                    {"type": "THROTTLE_CPU_USAGE", "packageName": "com.game", "description": "Throttle game"}
                ],
                "batteryScore": 250
            }));
        let response = pipeline(Arc::new(reasoning), store)
            .analyze(device(60.0, Some("hmm")))
            .await;

        assert_eq!(response.actionable.len(), 1);
        assert_eq!(
            response.actionable[0].action_type(),
            Some(ActionType::ThrottleCpuUsage)
        );
        assert_eq!(response.battery_score, 100.0);
        assert!(!response.insights.is_empty());
        assert_well_formed(&response);
    }

    #[tokio::test]
    async fn test_no_usable_apps_is_a_failed_response() {
        let store = Arc::new(InMemoryPatternStore::new());
        let snapshot = with_apps(50.0, vec![app("com.idle", 0.0, 0.0, 0.0)]);
        let response = pipeline(Arc::new(MockReasoningService::failing()), store.clone())
            .analyze(snapshot)
            .await;

        assert!(!response.success);
        assert_eq!(response.response_type, ResponseType::Error);
        assert_eq!(response.insights.len(), 1);
        assert_eq!(response.battery_score, 50.0);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_patterns_are_recorded_after_analysis() {
        let store = Arc::new(InMemoryPatternStore::new());
        let pipeline = pipeline(Arc::new(MockReasoningService::failing()), store.clone());
        pipeline.analyze(device(70.0, None)).await;
        pipeline.analyze(device(70.0, None)).await;

        let patterns = store.get_patterns("device-1").await.unwrap();
        assert_eq!(patterns.len(), 3);
        assert!(patterns["com.video"].contains("Very high battery usage"));
    }

    #[tokio::test]
    async fn test_store_outage_does_not_fail_analysis() {
        let store = Arc::new(InMemoryPatternStore::failing());
        let response = pipeline(Arc::new(MockReasoningService::failing()), store)
            .analyze(device(70.0, Some("Save my battery")))
            .await;
        assert!(response.success);
    }
}
