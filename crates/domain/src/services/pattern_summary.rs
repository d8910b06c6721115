//! Pattern text stored per (device, package) after each analysis.

use crate::models::{AppUsageRecord, UsagePattern};

const NORMAL_USAGE: &str = "Normal usage pattern";

/// Human-readable summary of one app's usage in a snapshot.
pub fn summarize_app(app: &AppUsageRecord, protected: bool) -> String {
    let mut parts: Vec<&str> = Vec::new();

    let battery = app.battery_percent();
    if battery > 20.0 {
        parts.push("Very high battery usage");
    } else if battery > 10.0 {
        parts.push("High battery usage");
    } else if battery > 5.0 {
        parts.push("Moderate battery usage");
    }

    let data = app.data_mb();
    if data > 500.0 {
        parts.push("Very high data usage");
    } else if data > 200.0 {
        parts.push("High data usage");
    } else if data > 50.0 {
        parts.push("Moderate data usage");
    }

    if app.foreground_time > 3600.0 {
        parts.push("Heavy foreground usage");
    } else if app.foreground_time > 1800.0 {
        parts.push("Regular foreground usage");
    } else if app.foreground_time < 300.0 {
        parts.push("Rarely used in foreground");
    }

    if protected {
        parts.push("Critical app for user");
    }

    if parts.is_empty() {
        NORMAL_USAGE.to_string()
    } else {
        parts.join("; ")
    }
}

/// Pattern rows for every app in a snapshot.
pub fn patterns_for<'a>(
    device_id: &str,
    timestamp: i64,
    apps: impl IntoIterator<Item = (&'a AppUsageRecord, bool)>,
) -> Vec<UsagePattern> {
    apps.into_iter()
        .map(|(app, protected)| UsagePattern {
            device_id: device_id.to_string(),
            package_name: app.package_name.clone(),
            pattern: summarize_app(app, protected),
            timestamp,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::app;

    #[test]
    fn test_heavy_app_summary() {
        let summary = summarize_app(&app("com.video", 25.0, 800.0, 7200.0), false);
        assert_eq!(
            summary,
            "Very high battery usage; Very high data usage; Heavy foreground usage"
        );
    }

    #[test]
    fn test_light_protected_app_summary() {
        let summary = summarize_app(&app("com.waze", 1.0, 1.0, 60.0), true);
        assert_eq!(summary, "Rarely used in foreground; Critical app for user");
    }

    #[test]
    fn test_normal_usage_fallback() {
        let summary = summarize_app(&app("com.notes", 2.0, 10.0, 900.0), false);
        assert_eq!(summary, NORMAL_USAGE);
    }

    #[test]
    fn test_patterns_for_every_app() {
        let apps = [app("a.one", 1.0, 1.0, 900.0), app("b.two", 30.0, 1.0, 900.0)];
        let rows = patterns_for("device-1", 42, apps.iter().map(|a| (a, false)));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].package_name, "b.two");
        assert_eq!(rows[1].pattern, "Very high battery usage");
        assert!(rows.iter().all(|r| r.timestamp == 42 && r.device_id == "device-1"));
    }
}
