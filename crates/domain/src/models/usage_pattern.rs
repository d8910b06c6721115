//! Persisted usage patterns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-text summary of one app's behavior on one device. At most one
/// pattern exists per (device, package) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePattern {
    pub device_id: String,
    pub package_name: String,
    pub pattern: String,
    /// Last update, seconds since epoch.
    pub timestamp: i64,
}

/// Response for `GET /api/v1/patterns/:device_id`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePatternsResponse {
    pub device_id: String,
    pub patterns: BTreeMap<String, String>,
}
