//! Snapshot normalizer.
//!
//! Clamps impossible telemetry values to their nearest valid bound and drops
//! app records that carry no usable usage. Normalizing an already
//! normalized snapshot is a no-op.

use std::ops::Deref;

use shared::units::{clamp_non_negative, clamp_percent};
use tracing::debug;

use crate::models::snapshot::{
    AppUsageRecord, BatteryState, CpuState, DataUsage, DeviceSnapshot, MemoryState, NetworkState,
};

/// A sanitized snapshot. Only [`normalize`] constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSnapshot {
    snapshot: DeviceSnapshot,
    dropped_apps: usize,
}

impl NormalizedSnapshot {
    /// Number of app records removed during normalization.
    pub fn dropped_apps(&self) -> usize {
        self.dropped_apps
    }

    pub fn has_apps(&self) -> bool {
        !self.snapshot.apps.is_empty()
    }

    /// Prompt text, if a non-blank one was supplied.
    pub fn prompt(&self) -> Option<&str> {
        self.snapshot.prompt.as_deref()
    }

    pub fn into_inner(self) -> DeviceSnapshot {
        self.snapshot
    }
}

impl Deref for NormalizedSnapshot {
    type Target = DeviceSnapshot;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}

/// Sanitizes a raw snapshot.
pub fn normalize(mut snapshot: DeviceSnapshot) -> NormalizedSnapshot {
    normalize_battery(&mut snapshot.battery);
    normalize_memory(&mut snapshot.memory);
    normalize_cpu(&mut snapshot.cpu);
    normalize_network(&mut snapshot.network);

    snapshot.device_id = snapshot.device_id.trim().to_string();
    snapshot.prompt = snapshot
        .prompt
        .take()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    snapshot.current_data_mb = snapshot.current_data_mb.map(clamp_non_negative);
    snapshot.total_data_mb = snapshot.total_data_mb.map(clamp_non_negative);

    let before = snapshot.apps.len();
    snapshot.apps = std::mem::take(&mut snapshot.apps)
        .into_iter()
        .map(normalize_app)
        .filter(|app| !app.package_name.is_empty() && app.has_usage())
        .collect();
    let dropped_apps = before - snapshot.apps.len();

    if dropped_apps > 0 {
        debug!(
            device_id = %snapshot.device_id,
            dropped_apps = dropped_apps,
            "Dropped app records without usable usage"
        );
    }

    NormalizedSnapshot {
        snapshot,
        dropped_apps,
    }
}

fn normalize_battery(battery: &mut BatteryState) {
    battery.level = clamp_percent(battery.level);
    battery.temperature = clamp_non_negative(battery.temperature);
    battery.voltage = clamp_non_negative(battery.voltage);
    battery.capacity = clamp_non_negative(battery.capacity);
    battery.current_now = clamp_non_negative(battery.current_now);
    battery.health = battery.health.max(0);
    battery.charging_type = battery.charging_type.trim().to_string();
}

fn normalize_memory(memory: &mut MemoryState) {
    memory.total_ram = clamp_non_negative(memory.total_ram);
    memory.available_ram = clamp_non_negative(memory.available_ram);
    memory.threshold = clamp_non_negative(memory.threshold);
    if memory.total_ram > 0.0 && memory.available_ram > memory.total_ram {
        memory.available_ram = memory.total_ram;
    }
}

fn normalize_cpu(cpu: &mut CpuState) {
    cpu.usage = cpu.usage.map(clamp_percent);
    cpu.temperature = cpu.temperature.map(clamp_non_negative);
    for frequency in &mut cpu.frequencies {
        *frequency = clamp_non_negative(*frequency);
    }
}

fn normalize_network(network: &mut NetworkState) {
    network.network_type = network.network_type.trim().to_string();
    network.strength = network.strength.map(clamp_non_negative);
    normalize_data_usage(&mut network.data_usage);
}

fn normalize_data_usage(usage: &mut DataUsage) {
    usage.foreground = clamp_non_negative(usage.foreground);
    usage.background = clamp_non_negative(usage.background);
    usage.rx_bytes = clamp_non_negative(usage.rx_bytes);
    usage.tx_bytes = clamp_non_negative(usage.tx_bytes);
}

fn normalize_app(mut app: AppUsageRecord) -> AppUsageRecord {
    app.package_name = app.package_name.trim().to_string();
    app.app_name = app.app_name.trim().to_string();
    app.last_used = app.last_used.max(0);
    app.foreground_time = clamp_non_negative(app.foreground_time);
    app.background_time = clamp_non_negative(app.background_time);
    app.battery_usage = app.battery_usage.map(clamp_percent);
    app.memory_usage = app.memory_usage.map(clamp_non_negative);
    app.cpu_usage = app.cpu_usage.map(clamp_percent);
    normalize_data_usage(&mut app.data_usage);
    app
}
