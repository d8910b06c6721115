//! User constraints extracted from a prompt.

use std::collections::BTreeSet;
use std::num::{NonZeroU32, NonZeroU64};

use serde::{Deserialize, Serialize};

/// Categories of apps a user can declare critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppCategory {
    Messaging,
    Navigation,
    Email,
    Work,
    HealthSafety,
}

impl AppCategory {
    pub const ALL: [AppCategory; 5] = [
        AppCategory::Messaging,
        AppCategory::Navigation,
        AppCategory::Email,
        AppCategory::Work,
        AppCategory::HealthSafety,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AppCategory::Messaging => "messaging",
            AppCategory::Navigation => "navigation",
            AppCategory::Email => "email",
            AppCategory::Work => "work",
            AppCategory::HealthSafety => "health and safety",
        }
    }
}

/// Requirements stated by the user. Empty when no prompt was supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    pub protected_categories: BTreeSet<AppCategory>,
    /// Canonical package ids for the protected categories (lowercased).
    pub protected_packages: BTreeSet<String>,
    /// How long the device has to last.
    pub time_budget_minutes: Option<NonZeroU32>,
    /// Remaining data allowance.
    pub data_budget_bytes: Option<NonZeroU64>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.protected_categories.is_empty()
            && self.protected_packages.is_empty()
            && self.time_budget_minutes.is_none()
            && self.data_budget_bytes.is_none()
    }

    pub fn time_budget_hours(&self) -> Option<f64> {
        self.time_budget_minutes
            .map(|minutes| f64::from(minutes.get()) / 60.0)
    }

    pub fn data_budget_mb(&self) -> Option<f64> {
        self.data_budget_bytes
            .map(|bytes| shared::units::bytes_to_mb(bytes.get() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints_are_empty() {
        let constraints = Constraints::default();
        assert!(constraints.is_empty());
        assert_eq!(constraints.time_budget_hours(), None);
    }

    #[test]
    fn test_budget_conversions() {
        let constraints = Constraints {
            time_budget_minutes: NonZeroU32::new(90),
            data_budget_bytes: NonZeroU64::new(500 * 1024 * 1024),
            ..Default::default()
        };
        assert!(!constraints.is_empty());
        assert_eq!(constraints.time_budget_hours(), Some(1.5));
        assert_eq!(constraints.data_budget_mb(), Some(500.0));
    }
}
