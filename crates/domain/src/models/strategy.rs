//! Optimization strategy model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Optimization aggressiveness, ordered from least to most aggressive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Minimal,
    Balanced,
    Aggressive,
    VeryAggressive,
}

impl Tier {
    /// One level more aggressive, saturating at [`Tier::VeryAggressive`].
    pub fn escalate(self) -> Self {
        match self {
            Tier::Minimal => Tier::Balanced,
            Tier::Balanced => Tier::Aggressive,
            Tier::Aggressive | Tier::VeryAggressive => Tier::VeryAggressive,
        }
    }

    /// Whether the tier adds system-wide actions on top of per-app ones.
    pub fn is_aggressive(self) -> bool {
        self >= Tier::Aggressive
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Minimal => "minimal",
            Tier::Balanced => "balanced",
            Tier::Aggressive => "aggressive",
            Tier::VeryAggressive => "very aggressive",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Why the tier was raised above the battery-level baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationReason {
    /// Projected battery at the end of the requested duration falls below
    /// the reserve.
    TimeBudget {
        minutes: u32,
        projected_remaining_percent: f64,
    },
    /// Projected data use before the horizon exceeds the stated budget.
    DataBudget {
        budget_mb: f64,
        projected_mb: f64,
    },
}

/// Upper bounds on the savings a tier may claim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsTargets {
    pub battery_minutes: f64,
    pub data_mb: f64,
}

/// Chosen optimization posture for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub tier: Tier,
    /// Tier derived from battery level alone.
    pub base_tier: Tier,
    pub escalations: Vec<EscalationReason>,
    /// Lowercased package ids exempt from restriction.
    pub protected_packages: BTreeSet<String>,
    pub targets: SavingsTargets,
}

impl Strategy {
    pub fn is_protected(&self, package_name: &str) -> bool {
        self.protected_packages
            .contains(&package_name.to_ascii_lowercase())
    }
}
