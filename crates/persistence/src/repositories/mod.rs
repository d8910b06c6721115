//! Repository implementations for database operations.

pub mod usage_pattern;

pub use usage_pattern::UsagePatternRepository;
