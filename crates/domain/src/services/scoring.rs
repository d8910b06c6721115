//! Device health scores.
//!
//! Raw scores may fall outside `[0, 100]`; the response assembler clamps
//! them.

use crate::models::snapshot::BATTERY_HEALTH_GOOD;
use crate::models::{DeviceScores, DeviceSnapshot};

pub fn battery_score(snapshot: &DeviceSnapshot) -> f64 {
    let battery = &snapshot.battery;
    let mut score = (battery.level + 40.0).min(100.0);

    if battery.health != BATTERY_HEALTH_GOOD {
        score -= 10.0;
    }
    if battery.temperature > 40.0 {
        score -= 15.0;
    } else if battery.temperature > 35.0 {
        score -= 5.0;
    }
    if snapshot.settings.as_ref().is_some_and(|s| s.power_save_mode) {
        score += 10.0;
    }
    if battery.is_charging {
        score += 5.0;
    }
    score
}

pub fn data_score(snapshot: &DeviceSnapshot) -> f64 {
    let app_total: f64 = snapshot.apps.iter().map(|app| app.data_mb()).sum();
    let app_background: f64 = snapshot
        .apps
        .iter()
        .map(|app| app.data_usage.background)
        .sum();
    let network = &snapshot.network;
    let total = app_total.max(network.data_usage.total_mb());
    let background = app_background.max(network.data_usage.background);

    let mut score = if total > 0.0 { 80.0 } else { 90.0 };

    if total > 0.0 && background > total * 0.5 {
        score -= 10.0;
    }
    if network.is_wifi() {
        score += 15.0;
    } else if network.is_cellular() && network.is_roaming {
        score -= 20.0;
    }
    if snapshot.settings.as_ref().is_some_and(|s| s.data_saver) {
        score += 15.0;
    }
    score
}

pub fn performance_score(snapshot: &DeviceSnapshot) -> f64 {
    let memory = &snapshot.memory;
    let mut score = 70.0;

    if memory.total_ram > 0.0 {
        let free = memory.available_ram / memory.total_ram;
        if free > 0.5 {
            score += 10.0;
        } else if free < 0.2 {
            score -= 10.0;
        }
    }
    if memory.low_memory {
        score -= 20.0;
    }
    match snapshot.cpu.usage {
        Some(usage) if usage > 70.0 => score -= 15.0,
        Some(usage) if usage < 30.0 => score += 10.0,
        _ => {}
    }

    let crashing = snapshot.apps.iter().filter(|app| app.crashes > 0).count() as f64;
    score -= (crashing * 5.0).min(20.0);
    score
}

pub fn score_snapshot(snapshot: &DeviceSnapshot) -> DeviceScores {
    DeviceScores {
        battery: battery_score(snapshot),
        data: data_score(snapshot),
        performance: performance_score(snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{app, snapshot, with_apps};

    #[test]
    fn test_battery_score_adjustments() {
        let mut snap = snapshot(70.0);
        assert_eq!(battery_score(&snap), 100.0);

        snap.battery.level = 30.0;
        snap.battery.health = 3;
        snap.battery.temperature = 42.0;
        assert_eq!(battery_score(&snap), 45.0);

        snap.battery.is_charging = true;
        assert_eq!(battery_score(&snap), 50.0);
    }

    #[test]
    fn test_data_score_on_wifi_without_usage() {
        assert_eq!(data_score(&snapshot(50.0)), 105.0);
    }

    #[test]
    fn test_data_score_roaming_with_background_heavy_usage() {
        let mut heavy = app("com.sync", 1.0, 10.0, 60.0);
        heavy.data_usage.background = 90.0;
        let mut snap = with_apps(50.0, vec![heavy]);
        snap.network.network_type = "mobile".into();
        snap.network.is_roaming = true;
        assert_eq!(data_score(&snap), 50.0);
    }

    #[test]
    fn test_performance_score_penalties() {
        let mut crashing = app("com.crashy", 1.0, 1.0, 60.0);
        crashing.crashes = 3;
        let mut snap = with_apps(50.0, vec![crashing]);
        snap.memory.available_ram = snap.memory.total_ram * 0.1;
        snap.memory.low_memory = true;
        snap.cpu.usage = Some(90.0);
        assert_eq!(performance_score(&snap), 20.0);
    }

    #[test]
    fn test_performance_score_healthy_device() {
        let mut snap = snapshot(50.0);
        snap.memory.available_ram = snap.memory.total_ram * 0.6;
        snap.cpu.usage = Some(10.0);
        assert_eq!(performance_score(&snap), 90.0);
    }
}
