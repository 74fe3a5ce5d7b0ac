//! In-memory cache store.
//!
//! Same contract as [`FileCacheStore`](super::FileCacheStore) without
//! touching disk. Useful for tests and for hosts with no private storage.

use std::collections::HashMap;

use async_trait::async_trait;
use liveupdate_core::{
    is_expired, Configuration, ConfigurationArtifact, ConfigurationIdentity, LiveUpdateResult,
    Timestamp,
};
use tokio::sync::Mutex;

use super::freshness::Lookup;
use super::traits::{CacheStats, CacheStore, StatsCounters};

#[derive(Debug, Clone)]
struct StoredRecord {
    configuration: Configuration,
    expires_at: Option<Timestamp>,
}

/// Cache store backed by a map behind one exclusive guard.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    records: Mutex<HashMap<ConfigurationIdentity, StoredRecord>>,
    stats: StatsCounters,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, live or expired.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn lookup_at(&self, id: &ConfigurationIdentity, now: Timestamp) -> Lookup {
        let lookup = {
            let records = self.records.lock().await;
            match records.get(id) {
                None => Lookup::Miss,
                Some(StoredRecord {
                    expires_at: None, ..
                }) => Lookup::Invalid {
                    reason: "record has no expiration".to_string(),
                },
                Some(record) if is_expired(record.expires_at.as_ref(), &now) => Lookup::Expired {
                    expires_at: record.expires_at.unwrap_or(now),
                },
                Some(record) => Lookup::Hit(ConfigurationArtifact::new(
                    id.clone(),
                    record.configuration.clone(),
                    record.expires_at,
                )),
            }
        };
        tracing::debug!(identity = %id, outcome = lookup.label(), "Cache lookup");
        self.stats.record_lookup(&lookup);
        lookup
    }

    async fn put(&self, artifact: &ConfigurationArtifact) -> LiveUpdateResult<()> {
        let record = StoredRecord {
            configuration: artifact.configuration().clone(),
            expires_at: artifact.expires_at().copied(),
        };
        self.records.lock().await.insert(artifact.id().clone(), record);
        self.stats.record_write(true);
        Ok(())
    }

    async fn remove(&self, id: &ConfigurationIdentity) -> LiveUpdateResult<bool> {
        Ok(self.records.lock().await.remove(id).is_some())
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;

    fn make_artifact(expires_at: Option<Timestamp>) -> ConfigurationArtifact {
        let mut properties = BTreeMap::new();
        properties.insert("theme".to_string(), "dark".to_string());
        ConfigurationArtifact::new(
            ConfigurationIdentity::from_segment("seg1"),
            Configuration::new(BTreeMap::new(), properties),
            expires_at,
        )
    }

    #[tokio::test]
    async fn test_round_trip_and_expiration() {
        let store = MemoryCacheStore::new();
        let now = Utc::now();
        let artifact = make_artifact(Some(now + Duration::seconds(1)));

        assert!(store.get_at(artifact.id(), now).await.is_none());
        store.put(&artifact).await.expect("put should succeed");

        let cached = store.get_at(artifact.id(), now).await.expect("live");
        assert_eq!(cached.property("theme"), Some("dark"));

        assert!(store
            .get_at(artifact.id(), now + Duration::seconds(1))
            .await
            .is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_expiration_is_invalid() {
        let store = MemoryCacheStore::new();
        let artifact = make_artifact(None);
        store.put(&artifact).await.expect("put should succeed");

        assert!(matches!(
            store.lookup_at(artifact.id(), Utc::now()).await,
            Lookup::Invalid { .. }
        ));
    }

    #[tokio::test]
    async fn test_remove_and_stats() {
        let store = MemoryCacheStore::new();
        let artifact = make_artifact(Some(Utc::now() + Duration::hours(1)));
        store.put(&artifact).await.expect("put should succeed");
        let _ = store.get(artifact.id()).await;

        assert!(store.remove(artifact.id()).await.expect("remove"));
        assert!(store.is_empty().await);
        let _ = store.get(artifact.id()).await;

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }
}
