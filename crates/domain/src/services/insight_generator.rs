//! Insight generation.
//!
//! Information and predictive requests get descriptive answers only.
//! Action-producing intents get the strategy rationale, constraint notes
//! and savings estimates for the generated actions.

use std::collections::BTreeMap;

use regex::Regex;

use crate::catalog::{ActivityProfile, OptimizerCatalog};
use crate::models::{
    Actionable, AppUsageRecord, Constraints, DeviceSnapshot, EscalationReason, EstimatedSavings,
    Insight, IntentCategory, PromptClassification, ResourceFocus, Severity, Strategy, Tier,
};
use crate::services::actionable_generator::RankedApp;
use crate::services::constraint_extractor::parse_duration_minutes;
use crate::services::pattern_summary::summarize_app;
use crate::services::prompt_text::PromptText;
use crate::services::strategy_selector::DrainModel;

const DEFAULT_TOP_N: usize = 3;
const MAX_TOP_N: usize = 10;
const GENERAL_DRAIN_PERCENT_PER_HOUR: f64 = 10.0;
const LOW_BATTERY_PERCENT: f64 = 10.0;
const CRITICAL_BATTERY_PERCENT: f64 = 5.0;
const MAX_PATTERN_LINES: usize = 5;

lazy_static::lazy_static! {
    static ref TOP_N_REGEX: Regex = Regex::new(r"(?i)\btop\s+(\d+)\b").unwrap();
    static ref PERCENT_REGEX: Regex = Regex::new(r"(\d{1,3})\s*%").unwrap();
}

/// Everything the insight generator reads for one request.
#[derive(Debug, Clone, Copy)]
pub struct InsightContext<'a> {
    pub snapshot: &'a DeviceSnapshot,
    pub prompt: Option<&'a str>,
    pub classification: &'a PromptClassification,
    pub constraints: &'a Constraints,
    pub strategy: &'a Strategy,
    pub ranked: &'a [RankedApp<'a>],
    pub actions: &'a [Actionable],
    pub history: &'a BTreeMap<String, String>,
    pub drain: &'a DrainModel,
    pub catalog: &'a OptimizerCatalog,
}

pub fn generate_insights(ctx: &InsightContext<'_>) -> Vec<Insight> {
    match ctx.classification.intent {
        IntentCategory::Information => information_insights(ctx),
        IntentCategory::Predictive => predictive_insights(ctx),
        IntentCategory::Invalid => vec![Insight::new(
            "Unsupported",
            "Request not supported",
            "PowerGuard can answer questions about battery and data usage and optimize them. \
             Try asking which apps use the most battery, or how to save data.",
            Severity::Low,
        )],
        IntentCategory::Optimization
        | IntentCategory::Monitoring
        | IntentCategory::PatternAnalysis => optimization_insights(ctx),
    }
}

/// Sum of each restrictive action's contribution, capped by the tier's
/// targets. Reassurance actions contribute nothing.
pub fn estimate_savings(
    actions: &[Actionable],
    strategy: &Strategy,
    catalog: &OptimizerCatalog,
) -> EstimatedSavings {
    let (battery, data) = actions
        .iter()
        .filter(|action| action.payload.is_restrictive())
        .filter_map(Actionable::action_type)
        .map(|action_type| catalog.savings_for(action_type))
        .fold((0.0, 0.0), |(battery, data), savings| {
            (battery + savings.battery_minutes, data + savings.data_mb)
        });

    EstimatedSavings {
        battery_minutes: battery.min(strategy.targets.battery_minutes).max(0.0),
        data_mb: data.min(strategy.targets.data_mb).max(0.0),
    }
}

/// Number of apps an information request asks for.
pub fn requested_top_n(prompt: Option<&str>) -> usize {
    let Some(raw) = prompt else {
        return DEFAULT_TOP_N;
    };
    if let Some(n) = TOP_N_REGEX
        .captures(raw)
        .and_then(|caps| caps[1].parse::<usize>().ok())
    {
        return n.clamp(1, MAX_TOP_N);
    }
    let text = PromptText::new(raw);
    let singular = text.contains("app") && !text.contains("apps");
    if singular && (text.contains("which") || text.contains("what")) {
        1
    } else {
        DEFAULT_TOP_N
    }
}

fn information_insights(ctx: &InsightContext<'_>) -> Vec<Insight> {
    let n = requested_top_n(ctx.prompt);
    let mut insights = Vec::new();

    let wants_battery = ctx.classification.focus != ResourceFocus::Data;
    let wants_data = ctx.classification.focus != ResourceFocus::Battery;

    if wants_battery {
        insights.push(top_consumers(
            ctx.snapshot,
            n,
            "BatteryUsage",
            "battery",
            AppUsageRecord::battery_percent,
            |value| format!("{:.1}%", value),
        ));
    }
    if wants_data {
        insights.push(top_consumers(
            ctx.snapshot,
            n,
            "DataUsage",
            "data",
            AppUsageRecord::data_mb,
            |value| format!("{:.1} MB", value),
        ));
    }

    insights.push(device_status(ctx.snapshot));
    insights
}

fn top_consumers(
    snapshot: &DeviceSnapshot,
    n: usize,
    insight_type: &str,
    resource: &str,
    metric: fn(&AppUsageRecord) -> f64,
    format_value: fn(f64) -> String,
) -> Insight {
    let mut consumers: Vec<(&AppUsageRecord, f64)> = snapshot
        .apps
        .iter()
        .map(|app| (app, metric(app)))
        .filter(|(_, value)| *value > 0.0)
        .collect();
    consumers.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| a.0.package_name.cmp(&b.0.package_name))
    });
    consumers.truncate(n);

    if consumers.is_empty() {
        return Insight::new(
            "NoSignificantUsage",
            format!("No significant {} usage", resource),
            format!("No app used a measurable amount of {} in this snapshot.", resource),
            Severity::Info,
        );
    }

    let title = if consumers.len() == 1 {
        format!("Top {} consumer", resource)
    } else {
        format!("Top {} {} consumers", consumers.len(), resource)
    };
    let listing = consumers
        .iter()
        .enumerate()
        .map(|(i, (app, value))| format!("{}. {} ({})", i + 1, app.display_name(), format_value(*value)))
        .collect::<Vec<_>>()
        .join(", ");

    Insight::new(insight_type, title, listing, Severity::Info)
}

fn device_status(snapshot: &DeviceSnapshot) -> Insight {
    let battery = &snapshot.battery;
    let charging = if battery.is_charging { "charging" } else { "not charging" };
    let mut description = format!(
        "Battery at {:.0}% ({}, {:.1}°C).",
        battery.level, charging, battery.temperature
    );

    let memory = &snapshot.memory;
    if memory.total_ram > 0.0 {
        let free = memory.available_ram / memory.total_ram * 100.0;
        description.push_str(&format!(" Memory {:.0}% free", free));
        if memory.low_memory {
            description.push_str(", under memory pressure");
        }
        description.push('.');
    }

    let severity = if battery.level <= LOW_BATTERY_PERCENT && !battery.is_charging {
        Severity::Medium
    } else {
        Severity::Info
    };
    Insight::new("DeviceStatus", "Current device status", description, severity)
}

fn detect_activity<'c>(prompt: Option<&str>, catalog: &'c OptimizerCatalog) -> Option<&'c ActivityProfile> {
    let text = PromptText::new(prompt?);
    catalog
        .activities
        .iter()
        .find(|activity| activity.keywords.iter().any(|keyword| text.contains(keyword)))
}

fn format_hours(hours: f64) -> String {
    if (hours - 1.0).abs() < f64::EPSILON {
        "1 hour".to_string()
    } else if hours.fract() == 0.0 {
        format!("{:.0} hours", hours)
    } else {
        format!("{:.1} hours", hours)
    }
}

fn predictive_insights(ctx: &InsightContext<'_>) -> Vec<Insight> {
    let activity = detect_activity(ctx.prompt, ctx.catalog);
    let hours = ctx
        .prompt
        .and_then(parse_duration_minutes)
        .map(|minutes| f64::from(minutes.get()) / 60.0)
        .unwrap_or(1.0);
    let (label, drain_rate, data_rate) = match activity {
        Some(a) => (a.label.as_str(), a.battery_percent_per_hour, a.data_mb_per_hour),
        None => (
            "general use",
            GENERAL_DRAIN_PERCENT_PER_HOUR,
            ctx.drain.default_data_mb_per_hour,
        ),
    };
    let duration = format_hours(hours);
    let mut insights = Vec::new();

    if ctx.classification.focus != ResourceFocus::Data {
        let level = ctx.snapshot.battery.level;
        let needed = drain_rate * hours;
        let remaining = level - needed;
        let (title, severity) = if ctx.snapshot.battery.is_charging || remaining > 20.0 {
            ("Yes, you can", Severity::Low)
        } else if remaining > 5.0 {
            ("Yes, but battery will be low", Severity::Medium)
        } else {
            ("No, insufficient battery", Severity::High)
        };
        insights.push(Insight::new(
            "BatteryPrediction",
            title,
            format!(
                "{} for {} uses about {:.0}% battery. Starting from {:.0}% you would have about {:.0}% left.",
                capitalize(label),
                duration,
                needed,
                level,
                remaining.max(0.0)
            ),
            severity,
        ));
    }

    if ctx.classification.focus != ResourceFocus::Battery {
        let needed = data_rate * hours;
        let plan = ctx.snapshot.current_data_mb.zip(ctx.snapshot.total_data_mb);
        let insight = match plan {
            Some((used, total)) if total > 0.0 => {
                let remaining = (total - used).max(0.0);
                let (title, severity) = if needed <= remaining * 0.8 {
                    ("Yes, you have enough data", Severity::Low)
                } else if needed <= remaining {
                    ("Yes, but it will use most of your remaining data", Severity::Medium)
                } else {
                    ("No, not enough data", Severity::High)
                };
                Insight::new(
                    "DataPrediction",
                    title,
                    format!(
                        "{} for {} uses about {:.0} MB. You have {:.0} MB left of your {:.0} MB plan.",
                        capitalize(label),
                        duration,
                        needed,
                        remaining,
                        total
                    ),
                    severity,
                )
            }
            _ => Insight::new(
                "DataPrediction",
                "Estimated data use",
                format!(
                    "{} for {} uses about {:.0} MB of data.",
                    capitalize(label),
                    duration,
                    needed
                ),
                Severity::Info,
            ),
        };
        insights.push(insight);
    }

    insights
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn tier_severity(tier: Tier) -> Severity {
    match tier {
        Tier::VeryAggressive => Severity::High,
        Tier::Aggressive => Severity::Medium,
        Tier::Balanced => Severity::Low,
        Tier::Minimal => Severity::Info,
    }
}

fn strategy_insight(ctx: &InsightContext<'_>) -> Insight {
    let strategy = ctx.strategy;
    let mut description = format!(
        "Battery is at {:.0}%, which calls for a {} strategy",
        ctx.snapshot.battery.level, strategy.base_tier
    );
    for escalation in &strategy.escalations {
        match escalation {
            EscalationReason::TimeBudget {
                minutes,
                projected_remaining_percent,
            } => description.push_str(&format!(
                "; raised because the battery would drop to about {:.0}% over the requested {}",
                projected_remaining_percent,
                format_hours(f64::from(*minutes) / 60.0)
            )),
            EscalationReason::DataBudget {
                budget_mb,
                projected_mb,
            } => description.push_str(&format!(
                "; raised because projected use of {:.0} MB exceeds the {:.0} MB left",
                projected_mb, budget_mb
            )),
        }
    }
    description.push('.');

    let title = format!("{} optimization", capitalize(strategy.tier.label()));
    Insight::new("Strategy", title, description, tier_severity(strategy.tier))
}

fn optimization_insights(ctx: &InsightContext<'_>) -> Vec<Insight> {
    let mut insights = vec![strategy_insight(ctx)];
    let battery = &ctx.snapshot.battery;

    if battery.level <= LOW_BATTERY_PERCENT && !battery.is_charging {
        let severity = if battery.level <= CRITICAL_BATTERY_PERCENT {
            Severity::Critical
        } else {
            Severity::High
        };
        insights.push(Insight::new(
            "BatteryWarning",
            "Battery critically low",
            format!("Battery is at {:.0}%. Connect a charger soon.", battery.level),
            severity,
        ));
    }

    if !ctx.constraints.protected_categories.is_empty() {
        let categories = ctx
            .constraints
            .protected_categories
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ");
        let present: Vec<&str> = ctx
            .snapshot
            .apps
            .iter()
            .filter(|app| ctx.strategy.is_protected(&app.package_name))
            .map(AppUsageRecord::display_name)
            .collect();
        let description = if present.is_empty() {
            format!("{} apps will not be restricted.", capitalize(&categories))
        } else {
            format!(
                "{} apps will not be restricted: {}.",
                capitalize(&categories),
                present.join(", ")
            )
        };
        insights.push(Insight::new(
            "ProtectedApps",
            "Critical apps kept available",
            description,
            Severity::Info,
        ));
    }

    if let Some(hours) = ctx.constraints.time_budget_hours() {
        let rate = ctx.drain.battery_drain_rate(ctx.snapshot);
        let projected = (battery.level - rate * hours).max(0.0);
        insights.push(Insight::new(
            "TimeConstraint",
            format!("Battery needs to last {}", format_hours(hours)),
            format!(
                "At about {:.1}% per hour the battery is projected to reach {:.0}% by then.",
                rate, projected
            ),
            if projected < ctx.drain.reserve_battery_percent {
                Severity::High
            } else {
                Severity::Low
            },
        ));
    }

    if let Some(budget_mb) = ctx.constraints.data_budget_mb() {
        let rate = ctx.drain.data_rate(ctx.snapshot);
        insights.push(Insight::new(
            "DataConstraint",
            format!("{:.0} MB of data left", budget_mb),
            format!(
                "Recent usage is about {:.0} MB per hour, so the remaining data lasts roughly {}.",
                rate,
                format_hours((budget_mb / rate.max(f64::EPSILON)).min(999.0))
            ),
            Severity::Medium,
        ));
    }

    match ctx.classification.intent {
        IntentCategory::Monitoring => insights.push(monitoring_insight(ctx)),
        IntentCategory::PatternAnalysis => insights.push(pattern_insight(ctx)),
        _ => {}
    }

    let savings = estimate_savings(ctx.actions, ctx.strategy, ctx.catalog);
    if savings.battery_minutes > 0.0 {
        insights.push(Insight::new(
            "BatterySavings",
            "Estimated battery savings",
            format!(
                "These actions can extend battery life by about {:.0} minutes.",
                savings.battery_minutes
            ),
            Severity::Info,
        ));
    }
    if savings.data_mb > 0.0 {
        insights.push(Insight::new(
            "DataSavings",
            "Estimated data savings",
            format!("These actions can save about {:.0} MB of data.", savings.data_mb),
            Severity::Info,
        ));
    }

    if ctx.actions.iter().all(|action| !action.payload.is_restrictive()) {
        insights.push(Insight::new(
            "Status",
            "No restrictions needed",
            "No app is using enough resources to need restricting right now.",
            Severity::Info,
        ));
    }

    insights
}

fn monitoring_insight(ctx: &InsightContext<'_>) -> Insight {
    let threshold = ctx
        .prompt
        .and_then(|raw| PERCENT_REGEX.captures(raw))
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|value| *value <= 100);

    let description = match (ctx.classification.focus, threshold) {
        (ResourceFocus::Data, _) => {
            let used: f64 = ctx.snapshot.apps.iter().map(AppUsageRecord::data_mb).sum();
            format!(
                "Apps have used {:.0} MB in this snapshot. Data-heavy apps are restricted in the background to slow further use.",
                used
            )
        }
        (_, Some(percent)) => format!(
            "Battery is at {:.0}%. You will be alerted when it reaches {}%.",
            ctx.snapshot.battery.level, percent
        ),
        (_, None) => format!(
            "Battery is at {:.0}% and draining at about {:.1}% per hour.",
            ctx.snapshot.battery.level,
            ctx.drain.battery_drain_rate(ctx.snapshot)
        ),
    };
    Insight::new("Monitoring", "Monitoring enabled", description, Severity::Info)
}

fn pattern_insight(ctx: &InsightContext<'_>) -> Insight {
    let lines: Vec<String> = if ctx.history.is_empty() {
        ctx.ranked
            .iter()
            .take(MAX_PATTERN_LINES)
            .map(|ranked| {
                format!(
                    "{}: {}",
                    ranked.app.display_name(),
                    summarize_app(ranked.app, ctx.strategy.is_protected(&ranked.app.package_name))
                )
            })
            .collect()
    } else {
        ctx.history
            .iter()
            .take(MAX_PATTERN_LINES)
            .map(|(package, pattern)| format!("{}: {}", package, pattern))
            .collect()
    };

    let description = if lines.is_empty() {
        "No usage history has been recorded for this device yet.".to_string()
    } else {
        lines.join(". ")
    };
    Insight::new("UsagePatterns", "Usage patterns", description, Severity::Info)
}
