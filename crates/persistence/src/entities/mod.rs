//! Database entity definitions.

pub mod usage_pattern;

pub use usage_pattern::UsagePatternEntity;
