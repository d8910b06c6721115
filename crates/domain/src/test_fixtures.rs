//! Snapshot builders shared by unit tests.

use crate::models::snapshot::{
    AppUsageRecord, BatteryState, CpuState, DataUsage, DeviceSettings, DeviceSnapshot,
    MemoryState, NetworkState, BATTERY_HEALTH_GOOD,
};

/// A healthy, discharging device on wifi with no apps.
pub fn snapshot(level: f64) -> DeviceSnapshot {
    DeviceSnapshot {
        device_id: "device-1".to_string(),
        timestamp: 1_700_000_000,
        battery: BatteryState {
            level,
            temperature: 30.0,
            voltage: 3.8,
            is_charging: false,
            charging_type: "none".to_string(),
            health: BATTERY_HEALTH_GOOD,
            capacity: 0.0,
            current_now: 0.0,
        },
        memory: MemoryState {
            total_ram: 8_000_000_000.0,
            available_ram: 3_000_000_000.0,
            low_memory: false,
            threshold: 500_000_000.0,
        },
        cpu: CpuState {
            usage: Some(40.0),
            temperature: Some(35.0),
            frequencies: vec![1800.0],
        },
        network: NetworkState {
            network_type: "wifi".to_string(),
            strength: Some(3.0),
            is_roaming: false,
            data_usage: DataUsage::default(),
            cellular_generation: String::new(),
        },
        apps: Vec::new(),
        settings: Some(DeviceSettings::default()),
        prompt: None,
        current_data_mb: None,
        total_data_mb: None,
    }
}

/// App with battery percent, foreground data in MB and foreground seconds.
pub fn app(package_name: &str, battery: f64, data_mb: f64, foreground_secs: f64) -> AppUsageRecord {
    AppUsageRecord {
        package_name: package_name.to_string(),
        app_name: package_name
            .rsplit('.')
            .next()
            .unwrap_or(package_name)
            .to_string(),
        foreground_time: foreground_secs,
        background_time: foreground_secs / 2.0,
        battery_usage: Some(battery),
        data_usage: DataUsage {
            foreground: data_mb,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn with_apps(level: f64, apps: Vec<AppUsageRecord>) -> DeviceSnapshot {
    DeviceSnapshot {
        apps,
        ..snapshot(level)
    }
}
