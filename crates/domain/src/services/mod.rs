//! Analysis pipeline stages and their collaborators.
//!
//! Stages are pure functions of their inputs. Only the reasoning service and
//! the pattern store are async capabilities.

pub mod actionable_generator;
pub mod analysis;
pub mod assembler;
pub mod classifier;
pub mod constraint_extractor;
pub mod insight_generator;
pub mod normalizer;
pub mod pattern_store;
pub mod pattern_summary;
pub mod prompt_text;
pub mod reasoning;
pub mod scoring;
pub mod strategy_selector;

pub use analysis::AnalysisPipeline;
pub use assembler::{assemble, coerce_action_type, AssemblyContext, DraftAnalysis, RepairReport};
pub use classifier::{classify, resolve_by_rules, ClassifierOutcome, FallbackReason};
pub use normalizer::{normalize, NormalizedSnapshot};
pub use pattern_store::{InMemoryPatternStore, PatternStore, PatternStoreError};
pub use reasoning::{
    ClassificationRequest, DisabledReasoningService, MockReasoningService, ModelClassification,
    ReasoningError, ReasoningService, RecommendationRequest, RetryPolicy,
};
pub use strategy_selector::DrainModel;
