//! Device snapshot wire model.
//!
//! One telemetry capture as posted by the Android client. Numeric fields are
//! accepted as sent and sanitized later by the snapshot normalizer; only
//! structural problems (missing sections, bad identifiers) are rejected here.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One point-in-time capture of device and app resource usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    #[validate(custom(function = "shared::validation::validate_device_id"))]
    pub device_id: String,

    /// Capture time in seconds since epoch.
    #[validate(custom(function = "shared::validation::validate_capture_timestamp"))]
    pub timestamp: i64,

    pub battery: BatteryState,
    pub memory: MemoryState,
    pub cpu: CpuState,
    pub network: NetworkState,

    #[validate(length(max = 1000, message = "At most 1000 app records are accepted"))]
    pub apps: Vec<AppUsageRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<DeviceSettings>,

    /// Optional free-text user request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "Prompt must be at most 2000 characters"))]
    pub prompt: Option<String>,

    /// Mobile data consumed in the current billing period, in MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_data_mb: Option<f64>,

    /// Mobile data allowance for the current billing period, in MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_data_mb: Option<f64>,
}

/// Android `BatteryManager` health code for a healthy battery.
pub const BATTERY_HEALTH_GOOD: i32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryState {
    /// Charge level, 0-100.
    pub level: f64,

    /// Temperature in degrees Celsius.
    #[serde(default)]
    pub temperature: f64,

    /// Voltage in volts.
    #[serde(default)]
    pub voltage: f64,

    #[serde(default)]
    pub is_charging: bool,

    #[serde(default)]
    pub charging_type: String,

    /// Android `BatteryManager.BATTERY_HEALTH_*` code.
    #[serde(default = "default_battery_health")]
    pub health: i32,

    /// Design capacity in mAh.
    #[serde(default)]
    pub capacity: f64,

    /// Magnitude of the instantaneous discharge current in mA.
    #[serde(default)]
    pub current_now: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    /// Total RAM in bytes.
    pub total_ram: f64,

    /// Available RAM in bytes.
    pub available_ram: f64,

    #[serde(default)]
    pub low_memory: bool,

    /// Low-memory threshold in bytes.
    #[serde(default)]
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuState {
    /// Overall CPU usage, 0-100.
    #[serde(default)]
    pub usage: Option<f64>,

    /// CPU temperature in degrees Celsius.
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Per-core frequencies in MHz.
    #[serde(default)]
    pub frequencies: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    /// Connection type as reported by the client (`wifi`, `mobile`, `none`).
    #[serde(rename = "type")]
    pub network_type: String,

    #[serde(default)]
    pub strength: Option<f64>,

    #[serde(default)]
    pub is_roaming: bool,

    #[serde(default)]
    pub data_usage: DataUsage,

    #[serde(default)]
    pub cellular_generation: String,
}

impl NetworkState {
    pub fn is_wifi(&self) -> bool {
        self.network_type.eq_ignore_ascii_case("wifi")
    }

    pub fn is_cellular(&self) -> bool {
        matches!(
            self.network_type.to_ascii_lowercase().as_str(),
            "mobile" | "cellular"
        )
    }
}

/// Traffic counters. `foreground`/`background` are in MB, the byte counters
/// are raw totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUsage {
    #[serde(default)]
    pub foreground: f64,

    #[serde(default)]
    pub background: f64,

    #[serde(default)]
    pub rx_bytes: f64,

    #[serde(default)]
    pub tx_bytes: f64,
}

impl DataUsage {
    /// Total traffic in MB, preferring the split counters when reported.
    pub fn total_mb(&self) -> f64 {
        let split = self.foreground + self.background;
        if split > 0.0 {
            split
        } else {
            shared::units::bytes_to_mb(self.rx_bytes + self.tx_bytes)
        }
    }

    fn has_traffic(&self) -> bool {
        self.foreground > 0.0 || self.background > 0.0 || self.rx_bytes > 0.0 || self.tx_bytes > 0.0
    }
}

/// One app's usage within a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUsageRecord {
    #[serde(default)]
    pub package_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,

    #[serde(default)]
    pub app_name: String,

    #[serde(default)]
    pub is_system_app: bool,

    /// Last time the app was in the foreground, seconds since epoch.
    #[serde(default)]
    pub last_used: i64,

    /// Foreground time in seconds.
    #[serde(default)]
    pub foreground_time: f64,

    /// Background time in seconds.
    #[serde(default)]
    pub background_time: f64,

    /// Share of battery drain attributed to the app, 0-100.
    #[serde(default)]
    pub battery_usage: Option<f64>,

    #[serde(default)]
    pub data_usage: DataUsage,

    /// Resident memory in bytes.
    #[serde(default)]
    pub memory_usage: Option<f64>,

    /// CPU share, 0-100.
    #[serde(default)]
    pub cpu_usage: Option<f64>,

    #[serde(default)]
    pub notifications: u32,

    #[serde(default)]
    pub crashes: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
}

impl AppUsageRecord {
    pub fn battery_percent(&self) -> f64 {
        self.battery_usage.unwrap_or(0.0)
    }

    pub fn data_mb(&self) -> f64 {
        self.data_usage.total_mb()
    }

    /// Name to show in human-readable text, falling back to the package id.
    pub fn display_name(&self) -> &str {
        if self.app_name.trim().is_empty() {
            &self.package_name
        } else {
            &self.app_name
        }
    }

    /// True when at least one usage metric is positive.
    pub fn has_usage(&self) -> bool {
        self.battery_percent() > 0.0
            || self.data_usage.has_traffic()
            || self.foreground_time > 0.0
            || self.background_time > 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    #[serde(default)]
    pub power_save_mode: bool,

    #[serde(default)]
    pub data_saver: bool,

    #[serde(default)]
    pub battery_optimization: bool,

    #[serde(default)]
    pub adaptive_battery: bool,

    #[serde(default)]
    pub auto_sync: bool,
}

fn default_battery_health() -> i32 {
    BATTERY_HEALTH_GOOD
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_json() -> serde_json::Value {
        json!({
            "deviceId": "example-device-001",
            "timestamp": 1686123456,
            "battery": { "level": 45.0 },
            "memory": { "totalRam": 8000000000.0, "availableRam": 4000000000.0 },
            "cpu": {},
            "network": { "type": "wifi" },
            "apps": []
        })
    }

    #[test]
    fn test_deserialize_minimal_snapshot() {
        let snapshot: DeviceSnapshot = serde_json::from_value(minimal_json()).unwrap();
        assert_eq!(snapshot.device_id, "example-device-001");
        assert_eq!(snapshot.battery.health, BATTERY_HEALTH_GOOD);
        assert!(snapshot.prompt.is_none());
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_missing_battery_section_is_rejected() {
        let mut value = minimal_json();
        value.as_object_mut().unwrap().remove("battery");
        assert!(serde_json::from_value::<DeviceSnapshot>(value).is_err());
    }

    #[test]
    fn test_blank_device_id_fails_validation() {
        let mut value = minimal_json();
        value["deviceId"] = json!(" ");
        let snapshot: DeviceSnapshot = serde_json::from_value(value).unwrap();
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_overlong_prompt_fails_validation() {
        let mut value = minimal_json();
        value["prompt"] = json!("a".repeat(2001));
        let snapshot: DeviceSnapshot = serde_json::from_value(value).unwrap();
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_data_usage_total_prefers_split_counters() {
        let usage = DataUsage {
            foreground: 10.0,
            background: 5.0,
            rx_bytes: 99_999_999.0,
            tx_bytes: 0.0,
        };
        assert_eq!(usage.total_mb(), 15.0);

        let bytes_only = DataUsage {
            rx_bytes: 1_048_576.0,
            tx_bytes: 1_048_576.0,
            ..Default::default()
        };
        assert_eq!(bytes_only.total_mb(), 2.0);
    }

    #[test]
    fn test_app_display_name_falls_back_to_package() {
        let app = AppUsageRecord {
            package_name: "com.whatsapp".to_string(),
            ..Default::default()
        };
        assert_eq!(app.display_name(), "com.whatsapp");
    }

    #[test]
    fn test_network_kind_helpers() {
        let network = NetworkState {
            network_type: "WIFI".to_string(),
            strength: None,
            is_roaming: false,
            data_usage: DataUsage::default(),
            cellular_generation: String::new(),
        };
        assert!(network.is_wifi());
        assert!(!network.is_cellular());
    }
}
