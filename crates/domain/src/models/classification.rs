//! Prompt classification model.

use serde::{Deserialize, Serialize};

/// Which resource the user cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFocus {
    Battery,
    Data,
    /// Both or neither resource; treated as balanced.
    Other,
}

impl ResourceFocus {
    /// Parses a model answer such as `"BATTERY"` or `"data"`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "battery" | "power" => Some(ResourceFocus::Battery),
            "data" | "network" => Some(ResourceFocus::Data),
            "other" | "both" | "balanced" | "none" => Some(ResourceFocus::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceFocus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceFocus::Battery => write!(f, "battery"),
            ResourceFocus::Data => write!(f, "data"),
            ResourceFocus::Other => write!(f, "other"),
        }
    }
}

/// What the user wants the service to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Information,
    Predictive,
    Optimization,
    Monitoring,
    PatternAnalysis,
    Invalid,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 6] = [
        IntentCategory::Information,
        IntentCategory::Predictive,
        IntentCategory::Optimization,
        IntentCategory::Monitoring,
        IntentCategory::PatternAnalysis,
        IntentCategory::Invalid,
    ];

    /// Numeric code used in the model taxonomy (1-6).
    pub fn code(self) -> u8 {
        match self {
            IntentCategory::Information => 1,
            IntentCategory::Predictive => 2,
            IntentCategory::Optimization => 3,
            IntentCategory::Monitoring => 4,
            IntentCategory::PatternAnalysis => 5,
            IntentCategory::Invalid => 6,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| u64::from(c.code()) == code)
    }

    /// Parses a model answer: a symbolic name, or a numeric code as text.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        if let Ok(code) = normalized.parse::<u64>() {
            return Self::from_code(code);
        }
        match normalized.as_str() {
            "information" | "info" => Some(IntentCategory::Information),
            "predictive" | "prediction" => Some(IntentCategory::Predictive),
            "optimization" | "optimisation" | "optimize" => Some(IntentCategory::Optimization),
            "monitoring" | "monitor" => Some(IntentCategory::Monitoring),
            "pattern_analysis" | "pattern" | "patterns" => Some(IntentCategory::PatternAnalysis),
            "invalid" | "unsupported" => Some(IntentCategory::Invalid),
            _ => None,
        }
    }

    /// Whether this intent produces device actions.
    pub fn produces_actions(self) -> bool {
        matches!(
            self,
            IntentCategory::Optimization
                | IntentCategory::Monitoring
                | IntentCategory::PatternAnalysis
        )
    }

    /// Whether constraints are extracted from the prompt for this intent.
    pub fn extracts_constraints(self) -> bool {
        matches!(
            self,
            IntentCategory::Optimization | IntentCategory::Monitoring
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentCategory::Information => "information",
            IntentCategory::Predictive => "predictive",
            IntentCategory::Optimization => "optimization",
            IntentCategory::Monitoring => "monitoring",
            IntentCategory::PatternAnalysis => "pattern_analysis",
            IntentCategory::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Rule,
    Model,
}

/// Result of intent analysis for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptClassification {
    pub focus: ResourceFocus,
    pub intent: IntentCategory,
    pub source: ClassificationSource,
}

impl PromptClassification {
    /// Classification used when no prompt is supplied, or when every
    /// classification path has failed.
    pub fn balanced_optimization() -> Self {
        Self {
            focus: ResourceFocus::Other,
            intent: IntentCategory::Optimization,
            source: ClassificationSource::Rule,
        }
    }
}
