//! Actionable generation.
//!
//! Apps are ranked by a focus-weighted blend of battery and data use, then
//! each one gets at most one action chosen by the strategy tier. Protected
//! packages get an explicit unrestricted action instead of a restriction.

use tracing::debug;

use crate::catalog::{ActionThresholds, OptimizerCatalog};
use crate::models::actionable::{StandbyBucket, SystemSetting, ThrottleLevel, WakeLockPolicy};
use crate::models::snapshot::DeviceSettings;
use crate::models::{
    ActionPayload, Actionable, AppUsageRecord, PromptClassification, ResourceFocus, Strategy,
    Tier, SYSTEM_PACKAGE,
};

/// CPU share above which aggressive tiers throttle instead of parking.
const THROTTLE_CPU_PERCENT: f64 = 25.0;

/// An app with its weighted consumption score.
#[derive(Debug, Clone, Copy)]
pub struct RankedApp<'a> {
    pub app: &'a AppUsageRecord,
    pub score: f64,
}

fn weights(focus: ResourceFocus) -> (f64, f64) {
    match focus {
        ResourceFocus::Battery => (2.0, 1.0),
        ResourceFocus::Data => (1.0, 2.0),
        ResourceFocus::Other => (1.0, 1.0),
    }
}

/// Ranks apps highest consumer first. Battery and data are each scaled by
/// their maximum so neither unit dominates; ties order by package name.
pub fn rank_apps(apps: &[AppUsageRecord], focus: ResourceFocus) -> Vec<RankedApp<'_>> {
    let (battery_weight, data_weight) = weights(focus);
    let max_battery = apps.iter().map(AppUsageRecord::battery_percent).fold(0.0, f64::max);
    let max_data = apps.iter().map(AppUsageRecord::data_mb).fold(0.0, f64::max);

    let scale = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };

    let mut ranked: Vec<RankedApp<'_>> = apps
        .iter()
        .map(|app| RankedApp {
            app,
            score: battery_weight * scale(app.battery_percent(), max_battery)
                + data_weight * scale(app.data_mb(), max_data),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.app.package_name.cmp(&b.app.package_name))
    });
    ranked
}

/// Generates actions for the ranked apps under `strategy`. Empty for intents
/// that do not produce actions.
pub fn generate_actionables(
    ranked: &[RankedApp<'_>],
    strategy: &Strategy,
    classification: &PromptClassification,
    settings: Option<&DeviceSettings>,
    catalog: &OptimizerCatalog,
) -> Vec<Actionable> {
    if !classification.intent.produces_actions() {
        return Vec::new();
    }

    let thresholds = &catalog.thresholds;
    let focus = classification.focus;
    let mut actions = Vec::new();
    let mut restricted = 0usize;

    for (position, ranked_app) in ranked.iter().enumerate() {
        let app = ranked_app.app;

        if strategy.is_protected(&app.package_name) {
            actions.push(protect(app));
            continue;
        }
        if app.is_system_app || restricted >= thresholds.max_app_actions {
            continue;
        }

        let payload = match strategy.tier {
            Tier::VeryAggressive => Some(very_aggressive_payload(app, thresholds)),
            Tier::Aggressive => Some(aggressive_payload(app, focus, thresholds)),
            Tier::Balanced => balanced_payload(app, focus, thresholds),
            Tier::Minimal => {
                let is_top = ranked[..position].iter().all(|earlier| {
                    earlier.app.is_system_app || strategy.is_protected(&earlier.app.package_name)
                });
                if is_top {
                    minimal_payload(app, focus, thresholds)
                } else {
                    None
                }
            }
        };

        if let Some(payload) = payload {
            actions.push(restrict(app, payload, strategy.tier));
            restricted += 1;
        }
    }

    if strategy.tier.is_aggressive() {
        actions.extend(system_actions(strategy.tier, focus, settings));
    }

    debug!(
        tier = %strategy.tier,
        actions = actions.len(),
        restricted,
        "Actionables generated"
    );
    actions
}

fn very_aggressive_payload(app: &AppUsageRecord, t: &ActionThresholds) -> ActionPayload {
    if app.battery_percent() >= t.kill_battery_percent || app.data_mb() >= t.kill_data_mb {
        ActionPayload::KillApp
    } else {
        ActionPayload::SetStandbyBucket {
            bucket: StandbyBucket::Restricted,
        }
    }
}

fn aggressive_payload(app: &AppUsageRecord, focus: ResourceFocus, t: &ActionThresholds) -> ActionPayload {
    let data_dominant = focus == ResourceFocus::Data
        || (app.data_mb() >= t.balanced_data_mb
            && app.battery_percent() < t.balanced_battery_percent);

    if data_dominant && app.data_mb() > 0.0 {
        ActionPayload::RestrictBackgroundData { restricted: true }
    } else if app.cpu_usage.unwrap_or(0.0) >= THROTTLE_CPU_PERCENT {
        ActionPayload::ThrottleCpuUsage {
            level: ThrottleLevel::Moderate,
        }
    } else {
        ActionPayload::SetStandbyBucket {
            bucket: StandbyBucket::Restricted,
        }
    }
}

fn battery_payload(app: &AppUsageRecord) -> ActionPayload {
    if app.background_time > app.foreground_time {
        ActionPayload::ManageWakeLocks {
            policy: WakeLockPolicy::Limit,
        }
    } else {
        ActionPayload::SetStandbyBucket {
            bucket: StandbyBucket::Rare,
        }
    }
}

fn balanced_payload(
    app: &AppUsageRecord,
    focus: ResourceFocus,
    t: &ActionThresholds,
) -> Option<ActionPayload> {
    let battery_heavy = app.battery_percent() >= t.balanced_battery_percent;
    let data_heavy = app.data_mb() >= t.balanced_data_mb;

    match (battery_heavy, data_heavy) {
        (false, false) => None,
        (true, false) => Some(battery_payload(app)),
        (false, true) => Some(ActionPayload::RestrictBackgroundData { restricted: true }),
        (true, true) if focus == ResourceFocus::Data => {
            Some(ActionPayload::RestrictBackgroundData { restricted: true })
        }
        (true, true) => Some(battery_payload(app)),
    }
}

fn minimal_payload(
    app: &AppUsageRecord,
    focus: ResourceFocus,
    t: &ActionThresholds,
) -> Option<ActionPayload> {
    let battery_outlier = app.battery_percent() >= t.outlier_battery_percent;
    let data_outlier = app.data_mb() >= t.outlier_data_mb;

    match (battery_outlier, data_outlier) {
        (false, false) => None,
        (false, true) => Some(ActionPayload::RestrictBackgroundData { restricted: true }),
        (true, true) if focus == ResourceFocus::Data => {
            Some(ActionPayload::RestrictBackgroundData { restricted: true })
        }
        (true, _) => Some(battery_payload(app)),
    }
}

fn usage_summary(app: &AppUsageRecord) -> String {
    format!(
        "{} used {:.1}% battery and {:.1} MB of data",
        app.display_name(),
        app.battery_percent(),
        app.data_mb()
    )
}

fn protect(app: &AppUsageRecord) -> Actionable {
    Actionable::new(
        app.package_name.clone(),
        ActionPayload::SetStandbyBucket {
            bucket: StandbyBucket::Active,
        },
        format!("Keep {} unrestricted", app.display_name()),
        "You asked to keep this app available",
    )
}

fn restrict(app: &AppUsageRecord, payload: ActionPayload, tier: Tier) -> Actionable {
    let name = app.display_name();
    let description = match &payload {
        ActionPayload::KillApp => format!("Stop {}", name),
        ActionPayload::SetStandbyBucket { bucket } => {
            format!("Move {} to the {} standby bucket", name, bucket.as_str())
        }
        ActionPayload::RestrictBackgroundData { .. } => {
            format!("Restrict background data for {}", name)
        }
        ActionPayload::ManageWakeLocks { .. } => format!("Limit wake locks held by {}", name),
        ActionPayload::ThrottleCpuUsage { level } => {
            format!("Apply {} CPU throttling to {}", level.as_str(), name)
        }
        ActionPayload::ChangeSetting { .. } | ActionPayload::Unknown { .. } => {
            format!("Restrict {}", name)
        }
    };
    Actionable::new(
        app.package_name.clone(),
        payload,
        description,
        format!("{} ({} strategy)", usage_summary(app), tier),
    )
}

/// System-wide actions for the aggressive tiers. Settings already in their
/// saving state are skipped, but at least one action is always emitted.
fn system_actions(
    tier: Tier,
    focus: ResourceFocus,
    settings: Option<&DeviceSettings>,
) -> Vec<Actionable> {
    let current = settings.cloned().unwrap_or_default();
    let mut actions = Vec::new();

    if focus != ResourceFocus::Data && !current.power_save_mode {
        actions.push(battery_saver(tier));
    }

    // Aggressive means restricted background activity plus data saver,
    // whatever the focus.
    let wants_data_saver = tier == Tier::Aggressive || focus != ResourceFocus::Battery;
    if wants_data_saver && !current.data_saver {
        actions.push(data_saver(tier));
    }

    if tier == Tier::VeryAggressive && current.auto_sync {
        actions.push(auto_sync_off());
    }

    if actions.is_empty() {
        let fallback = if !current.power_save_mode {
            battery_saver(tier)
        } else if !current.data_saver {
            data_saver(tier)
        } else if current.auto_sync {
            auto_sync_off()
        } else {
            battery_saver(tier)
        };
        actions.push(fallback);
    }

    actions
}

fn battery_saver(tier: Tier) -> Actionable {
    Actionable::new(
        SYSTEM_PACKAGE,
        ActionPayload::ChangeSetting {
            setting: SystemSetting::BatterySaver,
            enabled: true,
        },
        "Enable battery saver",
        format!("Battery is low enough for a {} strategy", tier),
    )
}

fn data_saver(tier: Tier) -> Actionable {
    Actionable::new(
        SYSTEM_PACKAGE,
        ActionPayload::ChangeSetting {
            setting: SystemSetting::DataSaver,
            enabled: true,
        },
        "Enable data saver",
        format!("Limits background data across apps under a {} strategy", tier),
    )
}

fn auto_sync_off() -> Actionable {
    Actionable::new(
        SYSTEM_PACKAGE,
        ActionPayload::ChangeSetting {
            setting: SystemSetting::AutoSync,
            enabled: false,
        },
        "Turn off auto-sync",
        "Background sync drains battery and data while the battery is critical",
    )
}
