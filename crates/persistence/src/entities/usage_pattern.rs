//! Usage pattern entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::UsagePattern;
use sqlx::FromRow;

/// Database row mapping for the usage_patterns table.
#[derive(Debug, Clone, FromRow)]
pub struct UsagePatternEntity {
    pub id: i64,
    pub device_id: String,
    pub package_name: String,
    pub pattern: String,
    pub timestamp: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UsagePatternEntity> for UsagePattern {
    fn from(entity: UsagePatternEntity) -> Self {
        Self {
            device_id: entity.device_id,
            package_name: entity.package_name,
            pattern: entity.pattern,
            timestamp: entity.timestamp,
        }
    }
}
