//! Recommended device actions.
//!
//! The action type set is closed. Each type carries its own typed parameters
//! in [`ActionPayload`]; anything that cannot be parsed into a known type is
//! kept as [`ActionPayload::Unknown`] until the response assembler coerces or
//! discards it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Target package used for system-wide actions.
pub const SYSTEM_PACKAGE: &str = "system";

/// Closed set of action types a response may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    SetStandbyBucket,
    RestrictBackgroundData,
    KillApp,
    ManageWakeLocks,
    ThrottleCpuUsage,
    EnableBatterySaver,
    EnableDataSaver,
    AdjustSyncSettings,
}

impl ActionType {
    pub const ALL: [ActionType; 8] = [
        ActionType::SetStandbyBucket,
        ActionType::RestrictBackgroundData,
        ActionType::KillApp,
        ActionType::ManageWakeLocks,
        ActionType::ThrottleCpuUsage,
        ActionType::EnableBatterySaver,
        ActionType::EnableDataSaver,
        ActionType::AdjustSyncSettings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::SetStandbyBucket => "SET_STANDBY_BUCKET",
            ActionType::RestrictBackgroundData => "RESTRICT_BACKGROUND_DATA",
            ActionType::KillApp => "KILL_APP",
            ActionType::ManageWakeLocks => "MANAGE_WAKE_LOCKS",
            ActionType::ThrottleCpuUsage => "THROTTLE_CPU_USAGE",
            ActionType::EnableBatterySaver => "ENABLE_BATTERY_SAVER",
            ActionType::EnableDataSaver => "ENABLE_DATA_SAVER",
            ActionType::AdjustSyncSettings => "ADJUST_SYNC_SETTINGS",
        }
    }

    /// Exact, case-insensitive match against the wire names.
    pub fn from_wire(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|t| t.as_str() == upper)
    }

    /// System-wide types target [`SYSTEM_PACKAGE`] instead of an app.
    pub fn is_system_wide(self) -> bool {
        matches!(
            self,
            ActionType::EnableBatterySaver
                | ActionType::EnableDataSaver
                | ActionType::AdjustSyncSettings
        )
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Android app standby buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandbyBucket {
    Active,
    WorkingSet,
    Frequent,
    Rare,
    Restricted,
}

impl StandbyBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            StandbyBucket::Active => "active",
            StandbyBucket::WorkingSet => "working_set",
            StandbyBucket::Frequent => "frequent",
            StandbyBucket::Rare => "rare",
            StandbyBucket::Restricted => "restricted",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "active" | "normal" | "unrestricted" => Some(StandbyBucket::Active),
            "working_set" => Some(StandbyBucket::WorkingSet),
            "frequent" => Some(StandbyBucket::Frequent),
            "rare" => Some(StandbyBucket::Rare),
            "restricted" | "restrict" => Some(StandbyBucket::Restricted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeLockPolicy {
    Allow,
    Limit,
    Deny,
}

impl WakeLockPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            WakeLockPolicy::Allow => "allow",
            WakeLockPolicy::Limit => "limit",
            WakeLockPolicy::Deny => "deny",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "allow" | "allowed" | "normal" => Some(WakeLockPolicy::Allow),
            "limit" | "limited" | "restricted" | "optimized" => Some(WakeLockPolicy::Limit),
            "deny" | "denied" | "block" | "blocked" => Some(WakeLockPolicy::Deny),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleLevel {
    Light,
    Moderate,
    Heavy,
}

impl ThrottleLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ThrottleLevel::Light => "light",
            ThrottleLevel::Moderate => "moderate",
            ThrottleLevel::Heavy => "heavy",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" | "low" => Some(ThrottleLevel::Light),
            "moderate" | "medium" | "throttled" => Some(ThrottleLevel::Moderate),
            "heavy" | "high" => Some(ThrottleLevel::Heavy),
            _ => None,
        }
    }
}

/// Allow-listed system settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemSetting {
    BatterySaver,
    DataSaver,
    AutoSync,
}

/// Typed parameters for each action type.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    SetStandbyBucket { bucket: StandbyBucket },
    RestrictBackgroundData { restricted: bool },
    KillApp,
    ManageWakeLocks { policy: WakeLockPolicy },
    ThrottleCpuUsage { level: ThrottleLevel },
    ChangeSetting { setting: SystemSetting, enabled: bool },
    /// Unparsable type, kept only until repair.
    Unknown {
        type_name: String,
        new_mode: Option<String>,
        parameters: Map<String, Value>,
    },
}

impl ActionPayload {
    /// Builds a typed payload for a known type from loosely structured input.
    /// Missing or unrecognized modes fall back to the type's restrictive
    /// default.
    pub fn from_parts(
        action_type: ActionType,
        new_mode: Option<&str>,
        parameters: &Map<String, Value>,
    ) -> Self {
        let hint = new_mode
            .map(str::to_string)
            .or_else(|| first_string(parameters, &["mode", "bucket", "policy", "level", "value"]));
        let hint = hint.as_deref();

        match action_type {
            ActionType::SetStandbyBucket => ActionPayload::SetStandbyBucket {
                bucket: hint
                    .and_then(StandbyBucket::parse)
                    .unwrap_or(StandbyBucket::Restricted),
            },
            ActionType::RestrictBackgroundData => ActionPayload::RestrictBackgroundData {
                restricted: parameters
                    .get("restricted")
                    .and_then(Value::as_bool)
                    .unwrap_or_else(|| !hint.map(is_release_word).unwrap_or(false)),
            },
            ActionType::KillApp => ActionPayload::KillApp,
            ActionType::ManageWakeLocks => ActionPayload::ManageWakeLocks {
                policy: hint
                    .and_then(WakeLockPolicy::parse)
                    .unwrap_or(WakeLockPolicy::Limit),
            },
            ActionType::ThrottleCpuUsage => ActionPayload::ThrottleCpuUsage {
                level: hint
                    .and_then(ThrottleLevel::parse)
                    .unwrap_or(ThrottleLevel::Moderate),
            },
            ActionType::EnableBatterySaver => ActionPayload::ChangeSetting {
                setting: SystemSetting::BatterySaver,
                enabled: setting_enabled(parameters, hint),
            },
            ActionType::EnableDataSaver => ActionPayload::ChangeSetting {
                setting: SystemSetting::DataSaver,
                enabled: setting_enabled(parameters, hint),
            },
            ActionType::AdjustSyncSettings => ActionPayload::ChangeSetting {
                setting: SystemSetting::AutoSync,
                enabled: parameters
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .unwrap_or_else(|| hint.map(is_release_word).unwrap_or(false)),
            },
        }
    }

    /// `None` only for [`ActionPayload::Unknown`].
    pub fn action_type(&self) -> Option<ActionType> {
        match self {
            ActionPayload::SetStandbyBucket { .. } => Some(ActionType::SetStandbyBucket),
            ActionPayload::RestrictBackgroundData { .. } => {
                Some(ActionType::RestrictBackgroundData)
            }
            ActionPayload::KillApp => Some(ActionType::KillApp),
            ActionPayload::ManageWakeLocks { .. } => Some(ActionType::ManageWakeLocks),
            ActionPayload::ThrottleCpuUsage { .. } => Some(ActionType::ThrottleCpuUsage),
            ActionPayload::ChangeSetting { setting, .. } => Some(match setting {
                SystemSetting::BatterySaver => ActionType::EnableBatterySaver,
                SystemSetting::DataSaver => ActionType::EnableDataSaver,
                SystemSetting::AutoSync => ActionType::AdjustSyncSettings,
            }),
            ActionPayload::Unknown { .. } => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            ActionPayload::Unknown { type_name, .. } => type_name,
            other => other.action_type().map(ActionType::as_str).unwrap_or("UNKNOWN"),
        }
    }

    /// Mode the target ends up in, as shown to the client.
    pub fn new_mode(&self) -> String {
        match self {
            ActionPayload::SetStandbyBucket { bucket } => bucket.as_str().to_string(),
            ActionPayload::RestrictBackgroundData { restricted } => {
                let mode = if *restricted { "restricted" } else { "unrestricted" };
                mode.to_string()
            }
            ActionPayload::KillApp => "killed".to_string(),
            ActionPayload::ManageWakeLocks { policy } => policy.as_str().to_string(),
            ActionPayload::ThrottleCpuUsage { level } => level.as_str().to_string(),
            ActionPayload::ChangeSetting { enabled, .. } => {
                let mode = if *enabled { "enabled" } else { "disabled" };
                mode.to_string()
            }
            ActionPayload::Unknown { new_mode, .. } => new_mode.clone().unwrap_or_default(),
        }
    }

    pub fn parameters(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            ActionPayload::SetStandbyBucket { bucket } => {
                map.insert("bucket".into(), Value::from(bucket.as_str()));
            }
            ActionPayload::RestrictBackgroundData { restricted } => {
                map.insert("restricted".into(), Value::from(*restricted));
            }
            ActionPayload::KillApp => {}
            ActionPayload::ManageWakeLocks { policy } => {
                map.insert("policy".into(), Value::from(policy.as_str()));
            }
            ActionPayload::ThrottleCpuUsage { level } => {
                map.insert("level".into(), Value::from(level.as_str()));
            }
            ActionPayload::ChangeSetting { enabled, .. } => {
                map.insert("enabled".into(), Value::from(*enabled));
            }
            ActionPayload::Unknown { parameters, .. } => return parameters.clone(),
        }
        map
    }

    /// Whether the action limits what the target can do.
    pub fn is_restrictive(&self) -> bool {
        match self {
            ActionPayload::SetStandbyBucket { bucket } => *bucket != StandbyBucket::Active,
            ActionPayload::RestrictBackgroundData { restricted } => *restricted,
            ActionPayload::KillApp => true,
            ActionPayload::ManageWakeLocks { policy } => *policy != WakeLockPolicy::Allow,
            ActionPayload::ThrottleCpuUsage { .. } => true,
            ActionPayload::ChangeSetting { setting, enabled } => match setting {
                SystemSetting::AutoSync => !enabled,
                SystemSetting::BatterySaver | SystemSetting::DataSaver => *enabled,
            },
            ActionPayload::Unknown { .. } => true,
        }
    }
}

/// One recommended action.
#[derive(Debug, Clone, PartialEq)]
pub struct Actionable {
    pub id: String,
    /// Target package, or [`SYSTEM_PACKAGE`].
    pub package_name: String,
    pub description: String,
    pub reason: String,
    pub payload: ActionPayload,
}

impl Actionable {
    pub fn new(
        package_name: impl Into<String>,
        payload: ActionPayload,
        description: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            package_name: package_name.into(),
            description: description.into(),
            reason: reason.into(),
            payload,
        }
    }

    pub fn action_type(&self) -> Option<ActionType> {
        self.payload.action_type()
    }

    pub fn is_system_wide(&self) -> bool {
        self.package_name == SYSTEM_PACKAGE
    }
}

/// Wire shape of an actionable.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireActionable<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    action_type: &'a str,
    package_name: &'a str,
    description: &'a str,
    reason: &'a str,
    new_mode: String,
    parameters: Map<String, Value>,
}

impl Serialize for Actionable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireActionable {
            id: &self.id,
            action_type: self.payload.type_name(),
            package_name: &self.package_name,
            description: &self.description,
            reason: &self.reason,
            new_mode: self.payload.new_mode(),
            parameters: self.payload.parameters(),
        }
        .serialize(serializer)
    }
}

fn first_string(parameters: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| parameters.get(*key))
        .find_map(|value| value.as_str().map(str::to_string))
}

fn is_release_word(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "unrestricted" | "allowed" | "allow" | "normal" | "enabled" | "on" | "true"
    )
}

fn setting_enabled(parameters: &Map<String, Value>, hint: Option<&str>) -> bool {
    if let Some(enabled) = parameters.get("enabled").and_then(Value::as_bool) {
        return enabled;
    }
    !matches!(
        hint.map(|h| h.trim().to_ascii_lowercase()).as_deref(),
        Some("disabled" | "off" | "false")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_type_wire_names() {
        assert_eq!(ActionType::KillApp.as_str(), "KILL_APP");
        assert_eq!(
            ActionType::from_wire("restrict_background_data"),
            Some(ActionType::RestrictBackgroundData)
        );
        assert_eq!(ActionType::from_wire("SET_ALARM"), None);
    }

    #[test]
    fn test_serde_matches_wire_names() {
        for action_type in ActionType::ALL {
            let json = serde_json::to_value(action_type).unwrap();
            assert_eq!(json, json!(action_type.as_str()));
        }
    }

    #[test]
    fn test_from_parts_standby_defaults_to_restricted() {
        let payload = ActionPayload::from_parts(ActionType::SetStandbyBucket, None, &Map::new());
        assert_eq!(
            payload,
            ActionPayload::SetStandbyBucket {
                bucket: StandbyBucket::Restricted
            }
        );
        assert!(payload.is_restrictive());
    }

    #[test]
    fn test_from_parts_reads_mode_from_parameters() {
        let params = json!({ "bucket": "rare" });
        let payload = ActionPayload::from_parts(
            ActionType::SetStandbyBucket,
            None,
            params.as_object().unwrap(),
        );
        assert_eq!(payload.new_mode(), "rare");
    }

    #[test]
    fn test_from_parts_normal_mode_is_not_restrictive() {
        let payload =
            ActionPayload::from_parts(ActionType::SetStandbyBucket, Some("normal"), &Map::new());
        assert_eq!(payload.new_mode(), "active");
        assert!(!payload.is_restrictive());

        let data = ActionPayload::from_parts(
            ActionType::RestrictBackgroundData,
            Some("unrestricted"),
            &Map::new(),
        );
        assert!(!data.is_restrictive());
    }

    #[test]
    fn test_system_setting_types() {
        let payload =
            ActionPayload::from_parts(ActionType::EnableDataSaver, Some("enabled"), &Map::new());
        assert_eq!(payload.action_type(), Some(ActionType::EnableDataSaver));
        assert_eq!(payload.new_mode(), "enabled");
        assert!(ActionType::EnableDataSaver.is_system_wide());
        assert!(!ActionType::KillApp.is_system_wide());
    }

    #[test]
    fn test_actionable_serializes_to_wire_shape() {
        let action = Actionable::new(
            "com.netflix.mediaclient",
            ActionPayload::RestrictBackgroundData { restricted: true },
            "Restrict background data for Netflix",
            "High background data usage",
        );
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "RESTRICT_BACKGROUND_DATA");
        assert_eq!(json["packageName"], "com.netflix.mediaclient");
        assert_eq!(json["newMode"], "restricted");
        assert_eq!(json["parameters"]["restricted"], true);
        assert!(!json["id"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_payload_has_no_type() {
        let payload = ActionPayload::Unknown {
            type_name: "SET_ALARM".to_string(),
            new_mode: None,
            parameters: Map::new(),
        };
        assert_eq!(payload.action_type(), None);
        assert_eq!(payload.type_name(), "SET_ALARM");
    }
}
