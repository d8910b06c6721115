//! Pattern store capability.
//!
//! Keeps one pattern per (device, package). Upserts are last-write-wins on
//! pattern text and timestamp.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::UsagePattern;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternStoreError {
    #[error("Pattern store unavailable: {0}")]
    Unavailable(String),

    #[error("Pattern store query failed: {0}")]
    Query(String),
}

#[async_trait::async_trait]
pub trait PatternStore: Send + Sync {
    /// Package name to pattern text for one device.
    async fn get_patterns(&self, device_id: &str)
        -> Result<BTreeMap<String, String>, PatternStoreError>;

    /// Insert or replace the pattern for (device, package).
    async fn upsert_pattern(&self, pattern: &UsagePattern) -> Result<(), PatternStoreError>;

    /// Upsert several patterns. Stops at the first failure.
    async fn upsert_patterns(&self, patterns: &[UsagePattern]) -> Result<usize, PatternStoreError> {
        for pattern in patterns {
            self.upsert_pattern(pattern).await?;
        }
        Ok(patterns.len())
    }

    /// Every stored pattern, ordered by device then package.
    async fn list_all(&self) -> Result<Vec<UsagePattern>, PatternStoreError>;

    /// Delete every pattern. Returns the number removed.
    async fn reset(&self) -> Result<u64, PatternStoreError>;

    /// Cheap liveness check for readiness probes.
    async fn ping(&self) -> Result<(), PatternStoreError>;
}

/// Process-local pattern store.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    patterns: RwLock<BTreeMap<(String, String), UsagePattern>>,
    failing: AtomicBool,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails with [`PatternStoreError::Unavailable`].
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    fn check(&self) -> Result<(), PatternStoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PatternStoreError::Unavailable("simulated outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn get_patterns(
        &self,
        device_id: &str,
    ) -> Result<BTreeMap<String, String>, PatternStoreError> {
        self.check()?;
        let patterns = self.patterns.read().await;
        Ok(patterns
            .values()
            .filter(|p| p.device_id == device_id)
            .map(|p| (p.package_name.clone(), p.pattern.clone()))
            .collect())
    }

    async fn upsert_pattern(&self, pattern: &UsagePattern) -> Result<(), PatternStoreError> {
        self.check()?;
        let key = (pattern.device_id.clone(), pattern.package_name.clone());
        self.patterns.write().await.insert(key, pattern.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<UsagePattern>, PatternStoreError> {
        self.check()?;
        Ok(self.patterns.read().await.values().cloned().collect())
    }

    async fn reset(&self) -> Result<u64, PatternStoreError> {
        self.check()?;
        let mut patterns = self.patterns.write().await;
        let removed = patterns.len() as u64;
        patterns.clear();
        info!(removed, "In-memory pattern store reset");
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), PatternStoreError> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::{Fake, Faker};

    fn pattern(device: &str, package: &str, text: &str, timestamp: i64) -> UsagePattern {
        UsagePattern {
            device_id: device.into(),
            package_name: package.into(),
            pattern: text.into(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let store = InMemoryPatternStore::new();
        store
            .upsert_pattern(&pattern("d1", "com.video", "High battery usage", 1))
            .await
            .unwrap();
        store
            .upsert_pattern(&pattern("d1", "com.video", "Normal usage pattern", 2))
            .await
            .unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].pattern, "Normal usage pattern");
        assert_eq!(all[0].timestamp, 2);
    }

    #[tokio::test]
    async fn test_get_patterns_is_scoped_to_device() {
        let store = InMemoryPatternStore::new();
        store
            .upsert_patterns(&[
                pattern("d1", "com.a", "a", 1),
                pattern("d1", "com.b", "b", 1),
                pattern("d2", "com.a", "other", 1),
            ])
            .await
            .unwrap();

        let patterns = store.get_patterns("d1").await.unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns.get("com.a").map(String::as_str), Some("a"));
    }

    #[tokio::test]
    async fn test_random_devices_do_not_share_patterns() {
        let store = InMemoryPatternStore::new();
        let first: String = Faker.fake();
        let second = format!("{first}-other");
        store.upsert_pattern(&pattern(&first, "com.a", "a", 1)).await.unwrap();

        assert_eq!(store.get_patterns(&first).await.unwrap().len(), 1);
        assert!(store.get_patterns(&second).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_removes_everything() {
        let store = InMemoryPatternStore::new();
        store.upsert_pattern(&pattern("d1", "com.a", "a", 1)).await.unwrap();
        store.upsert_pattern(&pattern("d2", "com.a", "a", 1)).await.unwrap();

        assert_eq!(store.reset().await.unwrap(), 2);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_converge_to_one_row() {
        let store = std::sync::Arc::new(InMemoryPatternStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .upsert_pattern(&pattern("d1", "com.a", &format!("v{i}"), i))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = InMemoryPatternStore::failing();
        assert!(matches!(
            store.get_patterns("d1").await,
            Err(PatternStoreError::Unavailable(_))
        ));
        assert!(store.ping().await.is_err());
    }
}
