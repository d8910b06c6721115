//! Usage pattern repository.
//!
//! PostgreSQL implementation of the domain pattern store. One row per
//! (device_id, package_name); writes are last-write-wins.

use std::collections::BTreeMap;

use domain::models::UsagePattern;
use domain::services::{PatternStore, PatternStoreError};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::entities::UsagePatternEntity;
use crate::metrics::{record_pool_metrics, record_rows, QueryTimer, StoreOp};

/// Repository for usage pattern rows.
#[derive(Debug, Clone)]
pub struct UsagePatternRepository {
    pool: PgPool,
}

impl UsagePatternRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// All rows for one device, ordered by package name.
    pub async fn find_by_device(
        &self,
        device_id: &str,
    ) -> Result<Vec<UsagePatternEntity>, sqlx::Error> {
        let timer = QueryTimer::start(StoreOp::FindByDevice);
        let result = sqlx::query_as::<_, UsagePatternEntity>(
            r#"
            SELECT id, device_id, package_name, pattern, timestamp, created_at, updated_at
            FROM usage_patterns
            WHERE device_id = $1
            ORDER BY package_name
            "#,
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Insert or replace the pattern for (device, package).
    pub async fn upsert(&self, pattern: &UsagePattern) -> Result<UsagePatternEntity, sqlx::Error> {
        let timer = QueryTimer::start(StoreOp::Upsert);
        let result = sqlx::query_as::<_, UsagePatternEntity>(
            r#"
            INSERT INTO usage_patterns (device_id, package_name, pattern, timestamp)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (device_id, package_name)
            DO UPDATE SET pattern = EXCLUDED.pattern, timestamp = EXCLUDED.timestamp, updated_at = NOW()
            RETURNING id, device_id, package_name, pattern, timestamp, created_at, updated_at
            "#,
        )
        .bind(&pattern.device_id)
        .bind(&pattern.package_name)
        .bind(&pattern.pattern)
        .bind(pattern.timestamp)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Upsert a batch inside one transaction. Rows are written in key order
    /// so concurrent batches for the same device lock rows in the same order.
    pub async fn upsert_batch(&self, patterns: &[UsagePattern]) -> Result<usize, sqlx::Error> {
        let timer = QueryTimer::start(StoreOp::UpsertBatch);
        let result = self.upsert_in_tx(&lock_order(patterns)).await;
        timer.finish(&result);
        if let Ok(written) = result {
            record_rows(StoreOp::UpsertBatch, written as u64);
        }
        result
    }

    async fn upsert_in_tx(&self, patterns: &[&UsagePattern]) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for pattern in patterns {
            sqlx::query(
                r#"
                INSERT INTO usage_patterns (device_id, package_name, pattern, timestamp)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (device_id, package_name)
                DO UPDATE SET pattern = EXCLUDED.pattern, timestamp = EXCLUDED.timestamp, updated_at = NOW()
                "#,
            )
            .bind(&pattern.device_id)
            .bind(&pattern.package_name)
            .bind(&pattern.pattern)
            .bind(pattern.timestamp)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(patterns.len())
    }

    /// Every row, ordered by device then package.
    pub async fn find_all(&self) -> Result<Vec<UsagePatternEntity>, sqlx::Error> {
        let timer = QueryTimer::start(StoreOp::FindAll);
        let result = sqlx::query_as::<_, UsagePatternEntity>(
            r#"
            SELECT id, device_id, package_name, pattern, timestamp, created_at, updated_at
            FROM usage_patterns
            ORDER BY device_id, package_name
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);
        result
    }

    /// Delete every row. Returns the number of rows removed.
    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::start(StoreOp::DeleteAll);
        let result = sqlx::query("DELETE FROM usage_patterns")
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected());
        timer.finish(&result);
        if let Ok(removed) = result {
            record_rows(StoreOp::DeleteAll, removed);
        }
        result
    }
}

/// Batch rows sorted by (device_id, package_name), the unique key.
fn lock_order(patterns: &[UsagePattern]) -> Vec<&UsagePattern> {
    let mut ordered: Vec<&UsagePattern> = patterns.iter().collect();
    ordered.sort_by(|a, b| {
        a.device_id
            .cmp(&b.device_id)
            .then_with(|| a.package_name.cmp(&b.package_name))
    });
    ordered
}

/// Connection-level failures mean the store is unreachable; everything else
/// is a failed statement.
fn map_store_error(err: sqlx::Error) -> PatternStoreError {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => PatternStoreError::Unavailable(err.to_string()),
        other => PatternStoreError::Query(other.to_string()),
    }
}

#[async_trait::async_trait]
impl PatternStore for UsagePatternRepository {
    async fn get_patterns(
        &self,
        device_id: &str,
    ) -> Result<BTreeMap<String, String>, PatternStoreError> {
        let rows = self.find_by_device(device_id).await.map_err(map_store_error)?;
        debug!(device_id, count = rows.len(), "Loaded usage patterns");
        Ok(rows
            .into_iter()
            .map(|row| (row.package_name, row.pattern))
            .collect())
    }

    async fn upsert_pattern(&self, pattern: &UsagePattern) -> Result<(), PatternStoreError> {
        self.upsert(pattern).await.map_err(map_store_error)?;
        Ok(())
    }

    async fn upsert_patterns(&self, patterns: &[UsagePattern]) -> Result<usize, PatternStoreError> {
        self.upsert_batch(patterns).await.map_err(map_store_error)
    }

    async fn list_all(&self) -> Result<Vec<UsagePattern>, PatternStoreError> {
        let rows = self.find_all().await.map_err(map_store_error)?;
        Ok(rows.into_iter().map(UsagePattern::from).collect())
    }

    async fn reset(&self) -> Result<u64, PatternStoreError> {
        let removed = self.delete_all().await.map_err(map_store_error)?;
        info!(removed, "Usage pattern table reset");
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), PatternStoreError> {
        let timer = QueryTimer::start(StoreOp::Ping);
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        timer.finish(&result);
        record_pool_metrics(&self.pool);
        result.map(|_| ()).map_err(map_store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::{Fake, Faker};

    #[test]
    fn test_pool_errors_map_to_unavailable() {
        assert!(matches!(
            map_store_error(sqlx::Error::PoolTimedOut),
            PatternStoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_store_error(sqlx::Error::PoolClosed),
            PatternStoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_statement_errors_map_to_query() {
        assert!(matches!(
            map_store_error(sqlx::Error::RowNotFound),
            PatternStoreError::Query(_)
        ));
    }

    #[test]
    fn test_batch_rows_are_written_in_key_order() {
        let batch = vec![
            pattern("dev-b", "com.video", "x", 1),
            pattern("dev-a", "com.maps", "x", 1),
            pattern("dev-b", "com.game", "x", 1),
            pattern("dev-a", "com.chat", "x", 1),
        ];
        let reversed: Vec<UsagePattern> = batch.iter().rev().cloned().collect();

        let keys = |rows: Vec<&UsagePattern>| -> Vec<(String, String)> {
            rows.into_iter()
                .map(|p| (p.device_id.clone(), p.package_name.clone()))
                .collect()
        };
        let ordered = keys(lock_order(&batch));

        assert_eq!(
            ordered,
            vec![
                ("dev-a".to_string(), "com.chat".to_string()),
                ("dev-a".to_string(), "com.maps".to_string()),
                ("dev-b".to_string(), "com.game".to_string()),
                ("dev-b".to_string(), "com.video".to_string()),
            ]
        );
        assert_eq!(keys(lock_order(&reversed)), ordered);
    }

    async fn test_repository() -> Option<UsagePatternRepository> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.expect("connect to test database");
        crate::run_migrations(&pool).await.expect("run migrations");
        Some(UsagePatternRepository::new(pool))
    }

    fn pattern(device_id: &str, package: &str, text: &str, timestamp: i64) -> UsagePattern {
        UsagePattern {
            device_id: device_id.to_string(),
            package_name: package.to_string(),
            pattern: text.to_string(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let Some(repo) = test_repository().await else {
            return;
        };
        let device_id: String = Faker.fake();

        repo.upsert_pattern(&pattern(&device_id, "com.a", "first", 1))
            .await
            .unwrap();
        repo.upsert_pattern(&pattern(&device_id, "com.a", "second", 2))
            .await
            .unwrap();

        let patterns = repo.get_patterns(&device_id).await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns["com.a"], "second");

        let rows = repo.find_by_device(&device_id).await.unwrap();
        assert_eq!(rows[0].timestamp, 2);
    }

    #[tokio::test]
    async fn test_batch_upsert_and_device_isolation() {
        let Some(repo) = test_repository().await else {
            return;
        };
        let first: String = Faker.fake();
        let second: String = Faker.fake();

        let written = repo
            .upsert_patterns(&[
                pattern(&first, "com.a", "Normal usage pattern", 10),
                pattern(&first, "com.b", "High battery usage", 10),
                pattern(&second, "com.a", "Rarely used in foreground", 10),
            ])
            .await
            .unwrap();
        assert_eq!(written, 3);

        let patterns = repo.get_patterns(&first).await.unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns["com.b"], "High battery usage");

        let other = repo.get_patterns(&second).await.unwrap();
        assert_eq!(other["com.a"], "Rarely used in foreground");
    }

    #[tokio::test]
    async fn test_ping_succeeds_against_live_database() {
        let Some(repo) = test_repository().await else {
            return;
        };
        repo.ping().await.unwrap();
    }
}
