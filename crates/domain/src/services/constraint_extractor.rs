//! Constraint extraction from prompt text.
//!
//! Best effort: anything that does not parse is simply absent from the
//! resulting [`Constraints`].

use std::num::{NonZeroU32, NonZeroU64};

use regex::Regex;

use crate::catalog::OptimizerCatalog;
use crate::models::{Constraints, PromptClassification};
use crate::services::prompt_text::PromptText;

lazy_static::lazy_static! {
    static ref DURATION_REGEX: Regex = Regex::new(
        r"(?i)\b(\d+(?:\.\d+)?)\s*(hours?|hrs?|h|minutes?|mins?|m)\b"
    ).unwrap();
    static ref WORDED_DURATION_REGEX: Regex = Regex::new(
        r"(?i)\b(half an hour|an hour|one hour|a couple of hours|a few hours)\b"
    ).unwrap();
    static ref DATA_LEFT_REGEX: Regex = Regex::new(
        r"(?i)\b(\d+(?:\.\d+)?)\s*(kb|mb|gb)\b(?:\s+of)?(?:\s+(?:mobile|cellular))?(?:\s+data)?\s+(?:left|remaining|available)\b"
    ).unwrap();
    static ref DATA_HAVE_REGEX: Regex = Regex::new(
        r"(?i)\b(?:only\s+)?(?:have|got)\s+(\d+(?:\.\d+)?)\s*(kb|mb|gb)\b"
    ).unwrap();
}

/// First duration in the text, in minutes. Zero durations are absent.
pub fn parse_duration_minutes(text: &str) -> Option<NonZeroU32> {
    let minutes = if let Some(caps) = DURATION_REGEX.captures(text) {
        let amount: f64 = caps[1].parse().ok()?;
        let unit = caps[2].to_ascii_lowercase();
        if unit.starts_with('h') {
            amount * 60.0
        } else {
            amount
        }
    } else {
        let caps = WORDED_DURATION_REGEX.captures(text)?;
        match caps[1].to_ascii_lowercase().as_str() {
            "half an hour" => 30.0,
            "a couple of hours" => 120.0,
            "a few hours" => 180.0,
            _ => 60.0,
        }
    };

    if !minutes.is_finite() || minutes > f64::from(u32::MAX) {
        return None;
    }
    NonZeroU32::new(minutes.round() as u32)
}

/// Remaining data allowance in bytes, from phrases like "500 MB left" or
/// "I only have 1.5 GB". Zero budgets are absent.
pub fn parse_data_budget_bytes(text: &str) -> Option<NonZeroU64> {
    let caps = DATA_LEFT_REGEX
        .captures(text)
        .or_else(|| DATA_HAVE_REGEX.captures(text))?;
    let amount: f64 = caps[1].parse().ok()?;
    let multiplier = match caps[2].to_ascii_lowercase().as_str() {
        "kb" => 1024.0,
        "gb" => 1024.0 * 1024.0 * 1024.0,
        _ => 1024.0 * 1024.0,
    };
    let bytes = amount * multiplier;
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return None;
    }
    NonZeroU64::new(bytes.round() as u64)
}

/// Extracts constraints for optimization and monitoring requests. Every
/// other intent yields empty constraints.
pub fn extract_constraints(
    prompt: Option<&str>,
    classification: &PromptClassification,
    catalog: &OptimizerCatalog,
) -> Constraints {
    let raw = match prompt {
        Some(raw) if classification.intent.extracts_constraints() => raw,
        _ => return Constraints::default(),
    };

    let text = PromptText::new(raw);
    let protected_categories = catalog
        .categories
        .iter()
        .filter(|entry| entry.keywords.iter().any(|keyword| text.contains(keyword)))
        .map(|entry| entry.category)
        .collect();
    let protected_packages = catalog.packages_for(&protected_categories);

    Constraints {
        protected_categories,
        protected_packages,
        time_budget_minutes: parse_duration_minutes(raw),
        data_budget_bytes: parse_data_budget_bytes(raw),
    }
}
