//! Strategy selection from battery level and constraints.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::OptimizerCatalog;
use crate::models::{Constraints, DeviceSnapshot, EscalationReason, Strategy, Tier};

/// Fallback drain and usage rates used when the snapshot carries no
/// discharge trend or traffic history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrainModel {
    /// Battery percent lost per hour when discharging rate is unknown.
    pub default_drain_percent_per_hour: f64,
    /// Battery percent that must remain at the end of a time budget.
    pub reserve_battery_percent: f64,
    /// Data MB used per hour when no traffic is recorded.
    pub default_data_mb_per_hour: f64,
    /// Period the snapshot's data counters cover.
    pub usage_window_hours: f64,
}

impl Default for DrainModel {
    fn default() -> Self {
        Self {
            default_drain_percent_per_hour: 10.0,
            reserve_battery_percent: 10.0,
            default_data_mb_per_hour: 50.0,
            usage_window_hours: 24.0,
        }
    }
}

impl DrainModel {
    /// Percent per hour. Uses the instantaneous discharge current against
    /// battery capacity when both are known.
    pub fn battery_drain_rate(&self, snapshot: &DeviceSnapshot) -> f64 {
        let battery = &snapshot.battery;
        if !battery.is_charging && battery.capacity > 0.0 && battery.current_now > 0.0 {
            let rate = battery.current_now / battery.capacity * 100.0;
            if rate.is_finite() {
                return rate.max(self.default_drain_percent_per_hour / 4.0);
            }
        }
        self.default_drain_percent_per_hour
    }

    /// MB per hour from the snapshot's traffic over the usage window.
    pub fn data_rate(&self, snapshot: &DeviceSnapshot) -> f64 {
        let observed: f64 = snapshot.apps.iter().map(|app| app.data_mb()).sum::<f64>()
            .max(snapshot.network.data_usage.total_mb());
        if observed > 0.0 && self.usage_window_hours > 0.0 {
            observed / self.usage_window_hours
        } else {
            self.default_data_mb_per_hour
        }
    }
}

/// Tier from battery level alone.
pub fn base_tier(battery_level: f64) -> Tier {
    if battery_level <= 10.0 {
        Tier::VeryAggressive
    } else if battery_level <= 30.0 {
        Tier::Aggressive
    } else if battery_level <= 50.0 {
        Tier::Balanced
    } else {
        Tier::Minimal
    }
}

/// Picks the tier, escalating once per constraint the device cannot meet
/// at its estimated rates.
pub fn select_strategy(
    snapshot: &DeviceSnapshot,
    constraints: &Constraints,
    drain: &DrainModel,
    catalog: &OptimizerCatalog,
) -> Strategy {
    let level = snapshot.battery.level;
    let base = base_tier(level);
    let mut tier = base;
    let mut escalations = Vec::new();

    if let (Some(minutes), Some(hours)) =
        (constraints.time_budget_minutes, constraints.time_budget_hours())
    {
        let projected = level - drain.battery_drain_rate(snapshot) * hours;
        if !snapshot.battery.is_charging && projected < drain.reserve_battery_percent {
            tier = tier.escalate();
            escalations.push(EscalationReason::TimeBudget {
                minutes: minutes.get(),
                projected_remaining_percent: projected.max(0.0),
            });
        }
    }

    if let Some(budget_mb) = constraints.data_budget_mb() {
        let horizon = constraints
            .time_budget_hours()
            .unwrap_or(drain.usage_window_hours);
        let projected_mb = drain.data_rate(snapshot) * horizon;
        if projected_mb > budget_mb {
            tier = tier.escalate();
            escalations.push(EscalationReason::DataBudget {
                budget_mb,
                projected_mb,
            });
        }
    }

    debug!(
        device_id = %snapshot.device_id,
        base_tier = %base,
        tier = %tier,
        escalations = escalations.len(),
        "Strategy selected"
    );

    Strategy {
        tier,
        base_tier: base,
        escalations,
        protected_packages: constraints.protected_packages.clone(),
        targets: catalog.tier_targets(tier),
    }
}
