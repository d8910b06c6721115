//! Response assembly and repair.
//!
//! Generator output, whether it came from the rule engine or from the
//! reasoning service, is first lowered into a loosely typed draft. A single
//! pass then fills defaults, coerces or drops invalid actions, drops
//! incomplete insights and clamps every number into range before the draft
//! becomes an [`AnalysisResponse`].

use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::analysis::DEFAULT_SCORE;
use crate::models::{
    ActionPayload, ActionType, Actionable, AnalysisResponse, DeviceScores, EstimatedSavings,
    Insight, IntentCategory, ResponseType, SavingsTargets, Severity, SYSTEM_PACKAGE,
};
use crate::services::reasoning::extract_json_object;

const DEFAULT_REASON: &str = "Reduces resource usage";

/// Untrusted actionable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftActionable {
    pub id: Option<String>,
    pub action_type: Option<String>,
    pub package_name: Option<String>,
    pub description: Option<String>,
    pub reason: Option<String>,
    pub new_mode: Option<String>,
    pub parameters: Map<String, Value>,
}

/// Untrusted insight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftInsight {
    pub insight_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
}

/// Untrusted analysis content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftAnalysis {
    pub actionable: Vec<DraftActionable>,
    pub insights: Vec<DraftInsight>,
    pub battery_score: Option<f64>,
    pub data_score: Option<f64>,
    pub performance_score: Option<f64>,
    pub battery_minutes: Option<f64>,
    pub data_mb: Option<f64>,
}

impl From<&Actionable> for DraftActionable {
    fn from(action: &Actionable) -> Self {
        Self {
            id: Some(action.id.clone()),
            action_type: Some(action.payload.type_name().to_string()),
            package_name: Some(action.package_name.clone()),
            description: Some(action.description.clone()),
            reason: Some(action.reason.clone()),
            new_mode: Some(action.payload.new_mode()),
            parameters: action.payload.parameters(),
        }
    }
}

impl From<&Insight> for DraftInsight {
    fn from(insight: &Insight) -> Self {
        let severity = serde_json::to_value(insight.severity)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string));
        Self {
            insight_type: Some(insight.insight_type.clone()),
            title: Some(insight.title.clone()),
            description: Some(insight.description.clone()),
            severity,
        }
    }
}

impl DraftAnalysis {
    /// Draft from rule-engine output.
    pub fn from_generated(
        actions: &[Actionable],
        insights: &[Insight],
        scores: DeviceScores,
        savings: EstimatedSavings,
    ) -> Self {
        Self {
            actionable: actions.iter().map(DraftActionable::from).collect(),
            insights: insights.iter().map(DraftInsight::from).collect(),
            battery_score: Some(scores.battery),
            data_score: Some(scores.data),
            performance_score: Some(scores.performance),
            battery_minutes: Some(savings.battery_minutes),
            data_mb: Some(savings.data_mb),
        }
    }

    /// Draft from reasoning-service JSON. Accepts the object directly or a
    /// string containing it; anything else yields an empty draft.
    pub fn from_value(value: &Value) -> Self {
        let parsed;
        let object = match value {
            Value::Object(map) => map,
            Value::String(raw) => match extract_json_object(raw) {
                Ok(Value::Object(map)) => {
                    parsed = map;
                    &parsed
                }
                _ => return Self::default(),
            },
            _ => return Self::default(),
        };

        let actionable = array_field(object, &["actionable", "actionables", "actions"])
            .iter()
            .filter_map(Value::as_object)
            .map(|item| DraftActionable {
                id: text(item, &["id"]),
                action_type: text(item, &["type", "actionType", "action_type", "action"]),
                package_name: text(item, &["packageName", "package_name", "package", "app"]),
                description: text(item, &["description", "title"]),
                reason: text(item, &["reason", "rationale"]),
                new_mode: text(item, &["newMode", "new_mode", "mode"]),
                parameters: item
                    .get("parameters")
                    .or_else(|| item.get("params"))
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        let insights = array_field(object, &["insights", "insight"])
            .iter()
            .filter_map(Value::as_object)
            .map(|item| DraftInsight {
                insight_type: text(item, &["type", "category", "insightType"]),
                title: text(item, &["title"]),
                description: text(item, &["description", "message", "text"]),
                severity: text(item, &["severity", "level"]),
            })
            .collect();

        let savings = object
            .get("estimatedSavings")
            .or_else(|| object.get("estimated_savings"))
            .and_then(Value::as_object);

        Self {
            actionable,
            insights,
            battery_score: number(object, &["batteryScore", "battery_score"]),
            data_score: number(object, &["dataScore", "data_score"]),
            performance_score: number(object, &["performanceScore", "performance_score"]),
            battery_minutes: savings
                .and_then(|s| number(s, &["batteryMinutes", "battery_minutes", "battery"])),
            data_mb: savings.and_then(|s| number(s, &["dataMB", "dataMb", "data_mb", "data"])),
        }
    }
}

fn array_field<'v>(object: &'v Map<String, Value>, keys: &[&str]) -> &'v [Value] {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn number(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Maps an arbitrary type string onto the closed action set. Exact names
/// win, then separators are normalized, then keywords decide.
pub fn coerce_action_type(raw: &str) -> Option<ActionType> {
    if let Some(exact) = ActionType::from_wire(raw) {
        return Some(exact);
    }

    let normalized: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if let Some(found) = ActionType::from_wire(&normalized) {
        return Some(found);
    }

    let lower = normalized.to_ascii_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("battery_saver") || has("power_sav") || has("low_power") {
        Some(ActionType::EnableBatterySaver)
    } else if has("data_saver") {
        Some(ActionType::EnableDataSaver)
    } else if has("sync") {
        Some(ActionType::AdjustSyncSettings)
    } else if has("wake") {
        Some(ActionType::ManageWakeLocks)
    } else if has("cpu") || has("throttl") {
        Some(ActionType::ThrottleCpuUsage)
    } else if has("kill") || has("force_stop") || has("terminate") || has("stop_app") || has("close") {
        Some(ActionType::KillApp)
    } else if has("data") || has("network") {
        Some(ActionType::RestrictBackgroundData)
    } else if has("standby") || has("bucket") || has("background") || has("optimiz") {
        Some(ActionType::SetStandbyBucket)
    } else {
        None
    }
}

/// Counts of repairs made while assembling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub coerced_types: usize,
    pub dropped_actions: usize,
    pub dropped_insights: usize,
    pub defaulted_fields: usize,
    pub clamped_values: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Request-level facts the assembler enforces against.
#[derive(Debug, Clone)]
pub struct AssemblyContext<'a> {
    pub intent: IntentCategory,
    /// Lowercased package ids that must not be restricted.
    pub protected_packages: &'a BTreeSet<String>,
    pub savings_cap: Option<SavingsTargets>,
    pub success: bool,
    pub message: String,
    pub response_type: ResponseType,
    pub timestamp: i64,
}

pub fn assemble(draft: DraftAnalysis, ctx: AssemblyContext<'_>) -> (AnalysisResponse, RepairReport) {
    let mut report = RepairReport::default();

    let actionable = if ctx.intent.produces_actions() {
        repair_actions(draft.actionable, ctx.protected_packages, &mut report)
    } else {
        report.dropped_actions += draft.actionable.len();
        Vec::new()
    };

    let insights = repair_insights(draft.insights, &mut report);

    let battery_score = score(draft.battery_score, &mut report);
    let data_score = score(draft.data_score, &mut report);
    let performance_score = score(draft.performance_score, &mut report);

    let mut battery_minutes = savings(draft.battery_minutes, &mut report);
    let mut data_mb = savings(draft.data_mb, &mut report);
    if let Some(cap) = ctx.savings_cap {
        if battery_minutes > cap.battery_minutes {
            battery_minutes = cap.battery_minutes;
            report.clamped_values += 1;
        }
        if data_mb > cap.data_mb {
            data_mb = cap.data_mb;
            report.clamped_values += 1;
        }
    }

    if !report.is_clean() {
        debug!(
            coerced = report.coerced_types,
            dropped_actions = report.dropped_actions,
            dropped_insights = report.dropped_insights,
            defaulted = report.defaulted_fields,
            clamped = report.clamped_values,
            "Response repaired"
        );
    }

    let response = AnalysisResponse {
        id: uuid::Uuid::new_v4().to_string(),
        success: ctx.success,
        timestamp: ctx.timestamp,
        message: ctx.message,
        response_type: ctx.response_type,
        actionable,
        insights,
        battery_score,
        data_score,
        performance_score,
        estimated_savings: EstimatedSavings {
            battery_minutes,
            data_mb,
        },
    };
    (response, report)
}

fn repair_actions(
    drafts: Vec<DraftActionable>,
    protected: &BTreeSet<String>,
    report: &mut RepairReport,
) -> Vec<Actionable> {
    let mut seen: HashSet<(ActionType, String)> = HashSet::new();
    let mut actions = Vec::with_capacity(drafts.len());

    for draft in drafts {
        match repair_action(draft, report) {
            Some(action) => {
                let Some(action_type) = action.action_type() else {
                    debug!(action_type = %action.payload.type_name(), "Dropped unknown action type");
                    report.dropped_actions += 1;
                    continue;
                };
                let package = action.package_name.to_ascii_lowercase();
                if action.payload.is_restrictive() && protected.contains(&package) {
                    debug!(package = %action.package_name, "Dropped restriction on protected package");
                    report.dropped_actions += 1;
                    continue;
                }
                if !seen.insert((action_type, package)) {
                    report.dropped_actions += 1;
                    continue;
                }
                actions.push(action);
            }
            None => report.dropped_actions += 1,
        }
    }
    actions
}

fn repair_action(draft: DraftActionable, report: &mut RepairReport) -> Option<Actionable> {
    let raw_type = non_blank(draft.action_type)?;
    let payload = match coerce_action_type(&raw_type) {
        Some(action_type) => {
            if action_type.as_str() != raw_type {
                report.coerced_types += 1;
            }
            ActionPayload::from_parts(action_type, draft.new_mode.as_deref(), &draft.parameters)
        }
        None => ActionPayload::Unknown {
            type_name: raw_type,
            new_mode: draft.new_mode,
            parameters: draft.parameters,
        },
    };

    let description = non_blank(draft.description)?;

    let system_wide = payload.action_type().is_some_and(ActionType::is_system_wide);
    let package_name = if system_wide {
        if draft.package_name.as_deref().map(str::trim) != Some(SYSTEM_PACKAGE) {
            report.defaulted_fields += 1;
        }
        SYSTEM_PACKAGE.to_string()
    } else {
        let package = non_blank(draft.package_name)?;
        if package.eq_ignore_ascii_case(SYSTEM_PACKAGE) {
            return None;
        }
        package
    };

    let reason = non_blank(draft.reason).unwrap_or_else(|| {
        report.defaulted_fields += 1;
        DEFAULT_REASON.to_string()
    });
    let id = non_blank(draft.id).unwrap_or_else(|| {
        report.defaulted_fields += 1;
        uuid::Uuid::new_v4().to_string()
    });

    Some(Actionable {
        id,
        package_name,
        description,
        reason,
        payload,
    })
}

fn repair_insights(drafts: Vec<DraftInsight>, report: &mut RepairReport) -> Vec<Insight> {
    let total = drafts.len();
    let insights: Vec<Insight> = drafts
        .into_iter()
        .filter_map(|draft| {
            let severity = Severity::parse(&non_blank(draft.severity)?)?;
            Some(Insight::new(
                non_blank(draft.insight_type)?,
                non_blank(draft.title)?,
                non_blank(draft.description)?,
                severity,
            ))
        })
        .collect();
    report.dropped_insights += total - insights.len();
    insights
}

fn score(value: Option<f64>, report: &mut RepairReport) -> f64 {
    match value {
        Some(v) if v.is_finite() => {
            let clamped = v.clamp(0.0, 100.0);
            if clamped != v {
                report.clamped_values += 1;
            }
            clamped
        }
        _ => {
            report.defaulted_fields += 1;
            DEFAULT_SCORE
        }
    }
}

fn savings(value: Option<f64>, report: &mut RepairReport) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        Some(v) if v.is_finite() => {
            report.clamped_values += 1;
            0.0
        }
        _ => {
            report.defaulted_fields += 1;
            0.0
        }
    }
}
