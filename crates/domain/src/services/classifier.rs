//! Prompt classification.
//!
//! A rule pass over the catalog vocabularies resolves most prompts. When it
//! is inconclusive the reasoning service is consulted, and when that fails
//! the classification falls back to balanced optimization.

use metrics::counter;
use tracing::{debug, warn};

use crate::catalog::OptimizerCatalog;
use crate::models::{ClassificationSource, IntentCategory, PromptClassification, ResourceFocus};
use crate::services::prompt_text::PromptText;
use crate::services::reasoning::{ClassificationRequest, ReasoningService, RetryPolicy};

/// Tokens after a negation that it still applies to.
const NEGATION_WINDOW: usize = 3;

/// Why the rule pass could not decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No intent vocabulary matched.
    NoIntentSignal,
    /// A question matched, but nothing ties it to battery, data or apps.
    NoResourceSignal,
    /// Two intents scored equally at the top.
    ConflictingIntents(IntentCategory, IntentCategory),
}

impl FallbackReason {
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::NoIntentSignal => "no_intent_signal",
            FallbackReason::NoResourceSignal => "no_resource_signal",
            FallbackReason::ConflictingIntents(..) => "conflicting_intents",
        }
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOutcome {
    pub classification: PromptClassification,
    /// Set when the rule pass was inconclusive.
    pub inconclusive: Option<FallbackReason>,
    /// Set when the reasoning service failed and the default was used.
    pub degraded: bool,
}

/// Resource focus from the catalog's focus vocabularies. Negated mentions
/// do not count; mentioning both resources, or neither, is balanced.
pub fn detect_focus(text: &PromptText, catalog: &OptimizerCatalog) -> ResourceFocus {
    let negations: Vec<(usize, usize)> = catalog
        .negations
        .iter()
        .flat_map(|phrase| {
            let len = PromptText::phrase_len(phrase);
            text.positions(phrase).into_iter().map(move |pos| (pos, len))
        })
        .collect();

    let is_negated = |pos: usize| {
        negations
            .iter()
            .any(|(start, len)| start + len <= pos && pos - (start + len) < NEGATION_WINDOW)
    };

    let mentioned: Vec<ResourceFocus> = catalog
        .focus
        .iter()
        .filter(|vocab| {
            vocab
                .terms
                .iter()
                .flat_map(|term| text.positions(term))
                .any(|pos| !is_negated(pos))
        })
        .map(|vocab| vocab.focus)
        .collect();

    match mentioned.as_slice() {
        [single] => *single,
        _ => ResourceFocus::Other,
    }
}

/// Weighted vocabulary hits per intent. Multi-word phrases count double.
pub fn score_intents(text: &PromptText, catalog: &OptimizerCatalog) -> Vec<(IntentCategory, u32)> {
    catalog
        .intents
        .iter()
        .map(|vocab| {
            let score = vocab
                .phrases
                .iter()
                .map(|phrase| {
                    let weight = if PromptText::phrase_len(phrase) > 1 { 2 } else { 1 };
                    text.positions(phrase).len() as u32 * weight
                })
                .sum();
            (vocab.intent, score)
        })
        .collect()
}

fn mentions_resource(text: &PromptText, catalog: &OptimizerCatalog) -> bool {
    let focus_terms = catalog.focus.iter().flat_map(|v| v.terms.iter());
    let category_terms = catalog.categories.iter().flat_map(|c| c.keywords.iter());
    let activity_terms = catalog.activities.iter().flat_map(|a| a.keywords.iter());
    let generic = ["app", "apps", "phone", "device", "usage"];

    focus_terms
        .chain(category_terms)
        .chain(activity_terms)
        .any(|term| text.contains(term))
        || generic.iter().any(|term| text.contains(term))
}

/// Rule pass. Returns the classification when the vocabularies decide it,
/// otherwise the reason it is inconclusive.
pub fn resolve_by_rules(
    text: &PromptText,
    catalog: &OptimizerCatalog,
) -> Result<PromptClassification, FallbackReason> {
    let mut scores = score_intents(text, catalog);
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let (top_intent, top_score) = match scores.first() {
        Some(&(intent, score)) if score > 0 => (intent, score),
        _ => return Err(FallbackReason::NoIntentSignal),
    };

    let tied: Vec<IntentCategory> = scores
        .iter()
        .filter(|(_, score)| *score == top_score)
        .map(|(intent, _)| *intent)
        .collect();

    let intent = match tied.as_slice() {
        [only] => *only,
        [_, _]
            if tied.contains(&IntentCategory::Optimization)
                && tied.contains(&IntentCategory::Information) =>
        {
            IntentCategory::Optimization
        }
        [a, b, ..] => return Err(FallbackReason::ConflictingIntents(*a, *b)),
        [] => top_intent,
    };

    if !intent.extracts_constraints()
        && intent != IntentCategory::PatternAnalysis
        && !mentions_resource(text, catalog)
    {
        return Err(FallbackReason::NoResourceSignal);
    }

    Ok(PromptClassification {
        focus: detect_focus(text, catalog),
        intent,
        source: ClassificationSource::Rule,
    })
}

/// Classifies an optional prompt. Never fails: the worst case is balanced
/// optimization with `degraded` set.
pub async fn classify(
    prompt: Option<&str>,
    device_id: &str,
    catalog: &OptimizerCatalog,
    reasoning: &dyn ReasoningService,
    retry: &RetryPolicy,
) -> ClassifierOutcome {
    let text = match prompt.map(PromptText::new) {
        Some(text) if !text.is_blank() => text,
        _ => {
            return ClassifierOutcome {
                classification: PromptClassification::balanced_optimization(),
                inconclusive: None,
                degraded: false,
            }
        }
    };

    let reason = match resolve_by_rules(&text, catalog) {
        Ok(classification) => {
            debug!(
                device_id,
                focus = %classification.focus,
                intent = %classification.intent,
                "Prompt classified by rules"
            );
            return ClassifierOutcome {
                classification,
                inconclusive: None,
                degraded: false,
            };
        }
        Err(reason) => reason,
    };

    debug!(device_id, reason = reason.label(), "Rule pass inconclusive, asking reasoning service");

    let request = ClassificationRequest {
        device_id: device_id.to_string(),
        prompt: text.raw().to_string(),
    };

    match retry.run("classify", || reasoning.classify(&request)).await {
        Ok(model) => ClassifierOutcome {
            classification: PromptClassification {
                focus: model.focus,
                intent: model.intent,
                source: ClassificationSource::Model,
            },
            inconclusive: Some(reason),
            degraded: false,
        },
        Err(error) => {
            warn!(
                device_id,
                error = %error,
                "Reasoning service classification failed, using balanced optimization"
            );
            counter!("classification_fallbacks_total", "reason" => error.kind()).increment(1);
            ClassifierOutcome {
                classification: PromptClassification::balanced_optimization(),
                inconclusive: Some(reason),
                degraded: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reasoning::MockReasoningService;
    use std::time::Duration;

    fn rules(prompt: &str) -> Result<PromptClassification, FallbackReason> {
        resolve_by_rules(&PromptText::new(prompt), &OptimizerCatalog::standard())
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            attempt_timeout: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_save_my_battery_is_battery_optimization() {
        let c = rules("Save my battery").unwrap();
        assert_eq!(c.focus, ResourceFocus::Battery);
        assert_eq!(c.intent, IntentCategory::Optimization);
        assert_eq!(c.source, ClassificationSource::Rule);
    }

    #[test]
    fn test_top_consumers_question_is_information() {
        let c = rules("What apps are using the most battery?").unwrap();
        assert_eq!(c.focus, ResourceFocus::Battery);
        assert_eq!(c.intent, IntentCategory::Information);
    }

    #[test]
    fn test_feasibility_question_is_predictive() {
        let c = rules("Can I watch YouTube for 2 hours?").unwrap();
        assert_eq!(c.intent, IntentCategory::Predictive);
    }

    #[test]
    fn test_alert_request_is_monitoring() {
        let c = rules("Notify me when my data usage gets high").unwrap();
        assert_eq!(c.focus, ResourceFocus::Data);
        assert_eq!(c.intent, IntentCategory::Monitoring);
    }

    #[test]
    fn test_pattern_request() {
        let c = rules("Show my usage patterns").unwrap();
        assert_eq!(c.intent, IntentCategory::PatternAnalysis);
    }

    #[test]
    fn test_history_question_is_pattern_analysis() {
        let c = rules("What is my usage history?").unwrap();
        assert_eq!(c.intent, IntentCategory::PatternAnalysis);
        assert_eq!(c.source, ClassificationSource::Rule);

        let c = rules("Describe my history").unwrap();
        assert_eq!(c.intent, IntentCategory::PatternAnalysis);
    }

    #[test]
    fn test_optimization_outranks_information() {
        let c = rules("What should I do to save battery?").unwrap();
        assert_eq!(c.intent, IntentCategory::Optimization);
    }

    #[test]
    fn test_negated_resource_is_ignored() {
        let c = rules("Optimize data but not battery").unwrap();
        assert_eq!(c.focus, ResourceFocus::Data);
    }

    #[test]
    fn test_both_resources_is_other() {
        let c = rules("Reduce battery and data usage").unwrap();
        assert_eq!(c.focus, ResourceFocus::Other);
    }

    #[test]
    fn test_no_vocabulary_is_inconclusive() {
        assert_eq!(rules("hello there"), Err(FallbackReason::NoIntentSignal));
    }

    #[test]
    fn test_unrelated_question_is_inconclusive() {
        assert_eq!(rules("Tell me a joke"), Err(FallbackReason::NoResourceSignal));
    }

    #[test]
    fn test_tied_intents_conflict() {
        let result = rules("Will it alert");
        assert!(matches!(result, Err(FallbackReason::ConflictingIntents(_, _))));
    }

    #[tokio::test]
    async fn test_absent_prompt_defaults_to_balanced_optimization() {
        let mock = MockReasoningService::failing();
        let outcome = classify(None, "d1", &OptimizerCatalog::standard(), &mock, &fast_retry()).await;
        assert_eq!(outcome.classification, PromptClassification::balanced_optimization());
        assert!(!outcome.degraded);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_inconclusive_prompt_uses_model() {
        let mock = MockReasoningService::new()
            .with_classification(ResourceFocus::Data, IntentCategory::Invalid);
        let outcome = classify(
            Some("hello there"),
            "d1",
            &OptimizerCatalog::standard(),
            &mock,
            &fast_retry(),
        )
        .await;
        assert_eq!(outcome.classification.intent, IntentCategory::Invalid);
        assert_eq!(outcome.classification.source, ClassificationSource::Model);
        assert_eq!(outcome.inconclusive, Some(FallbackReason::NoIntentSignal));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_timeout_falls_back() {
        let mock = MockReasoningService::hanging();
        let outcome = classify(
            Some("hello there"),
            "d1",
            &OptimizerCatalog::standard(),
            &mock,
            &fast_retry(),
        )
        .await;
        assert_eq!(outcome.classification, PromptClassification::balanced_optimization());
        assert!(outcome.degraded);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_conclusive_prompt_skips_model() {
        let mock = MockReasoningService::failing();
        let outcome = classify(
            Some("Save my battery"),
            "d1",
            &OptimizerCatalog::standard(),
            &mock,
            &fast_retry(),
        )
        .await;
        assert!(!outcome.degraded);
        assert_eq!(mock.calls(), 0);
    }
}
