//! Human-readable insights.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Lenient parse for untrusted input.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" | "informational" | "none" => Some(Severity::Info),
            "low" | "minor" => Some(Severity::Low),
            "medium" | "moderate" | "warning" => Some(Severity::Medium),
            "high" | "severe" | "error" => Some(Severity::High),
            "critical" | "urgent" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// One explanatory note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Category tag, e.g. `Strategy`, `BatteryUsage`.
    #[serde(rename = "type")]
    pub insight_type: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Insight {
    pub fn new(
        insight_type: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            insight_type: insight_type.into(),
            title: title.into(),
            description: description.into(),
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_aliases() {
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse("moderate"), Some(Severity::Medium));
        assert_eq!(Severity::parse("catastrophic"), None);
    }

    #[test]
    fn test_insight_serializes_type_field() {
        let insight = Insight::new("Strategy", "Balanced plan", "Details", Severity::Info);
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["type"], "Strategy");
        assert_eq!(json["severity"], "info");
    }
}
