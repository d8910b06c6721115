//! Domain models for PowerGuard.

pub mod actionable;
pub mod analysis;
pub mod classification;
pub mod constraints;
pub mod insight;
pub mod snapshot;
pub mod strategy;
pub mod usage_pattern;

pub use actionable::{ActionPayload, ActionType, Actionable, SYSTEM_PACKAGE};
pub use analysis::{AnalysisResponse, DeviceScores, EstimatedSavings, ResponseType};
pub use classification::{ClassificationSource, IntentCategory, PromptClassification, ResourceFocus};
pub use constraints::{AppCategory, Constraints};
pub use insight::{Insight, Severity};
pub use snapshot::{AppUsageRecord, DeviceSnapshot};
pub use strategy::{EscalationReason, SavingsTargets, Strategy, Tier};
pub use usage_pattern::{DevicePatternsResponse, UsagePattern};
