//! Final analysis response.

use serde::Serialize;

use super::actionable::Actionable;
use super::classification::IntentCategory;
use super::insight::Insight;

/// Score used when a value is missing or unusable.
pub const DEFAULT_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Information,
    Predictive,
    Optimization,
    Monitoring,
    PatternAnalysis,
    Invalid,
    Error,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Information => "information",
            ResponseType::Predictive => "predictive",
            ResponseType::Optimization => "optimization",
            ResponseType::Monitoring => "monitoring",
            ResponseType::PatternAnalysis => "pattern_analysis",
            ResponseType::Invalid => "invalid",
            ResponseType::Error => "error",
        }
    }
}

impl From<IntentCategory> for ResponseType {
    fn from(intent: IntentCategory) -> Self {
        match intent {
            IntentCategory::Information => ResponseType::Information,
            IntentCategory::Predictive => ResponseType::Predictive,
            IntentCategory::Optimization => ResponseType::Optimization,
            IntentCategory::Monitoring => ResponseType::Monitoring,
            IntentCategory::PatternAnalysis => ResponseType::PatternAnalysis,
            IntentCategory::Invalid => ResponseType::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedSavings {
    pub battery_minutes: f64,
    #[serde(rename = "dataMB")]
    pub data_mb: f64,
}

/// Device health scores, each in `[0, 100]` once assembled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceScores {
    pub battery: f64,
    pub data: f64,
    pub performance: f64,
}

impl Default for DeviceScores {
    fn default() -> Self {
        Self {
            battery: DEFAULT_SCORE,
            data: DEFAULT_SCORE,
            performance: DEFAULT_SCORE,
        }
    }
}

/// Result returned by `POST /api/v1/analyze`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub id: String,
    pub success: bool,
    /// Seconds since epoch.
    pub timestamp: i64,
    pub message: String,
    pub response_type: ResponseType,
    pub actionable: Vec<Actionable>,
    pub insights: Vec<Insight>,
    pub battery_score: f64,
    pub data_score: f64,
    pub performance_score: f64,
    pub estimated_savings: EstimatedSavings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_savings_wire_names() {
        let savings = EstimatedSavings {
            battery_minutes: 30.0,
            data_mb: 12.5,
        };
        let json = serde_json::to_value(savings).unwrap();
        assert_eq!(json["batteryMinutes"], 30.0);
        assert_eq!(json["dataMB"], 12.5);
    }

    #[test]
    fn test_response_type_from_intent() {
        assert_eq!(
            ResponseType::from(IntentCategory::PatternAnalysis),
            ResponseType::PatternAnalysis
        );
        let json = serde_json::to_value(ResponseType::PatternAnalysis).unwrap();
        assert_eq!(json, "pattern_analysis");
    }
}
