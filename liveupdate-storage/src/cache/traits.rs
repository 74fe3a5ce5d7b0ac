//! Cache store trait and usage statistics.
//!
//! A store keeps at most one record per identity. Every operation runs under
//! the store's own exclusive guard, so a `get` never observes a half-written
//! `put`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use liveupdate_core::{ConfigurationArtifact, ConfigurationIdentity, LiveUpdateResult, Timestamp};

use super::freshness::Lookup;

/// Persistent store for configuration artifacts.
///
/// # Failure policy
///
/// Reads never fail: missing, expired, unreadable, or corrupt records all
/// come back as `None` so the caller refetches. Writes report failures, and
/// the caller decides whether to care (the resolver does not).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Classify the record for `id` as of `now`.
    async fn lookup_at(&self, id: &ConfigurationIdentity, now: Timestamp) -> Lookup;

    /// Get a live artifact as of `now`, or `None`.
    ///
    /// An artifact whose expiration equals `now` is already expired.
    async fn get_at(
        &self,
        id: &ConfigurationIdentity,
        now: Timestamp,
    ) -> Option<ConfigurationArtifact> {
        self.lookup_at(id, now).await.into_artifact()
    }

    /// Get a live artifact as of the current time, or `None`.
    async fn get(&self, id: &ConfigurationIdentity) -> Option<ConfigurationArtifact> {
        self.get_at(id, Utc::now()).await
    }

    /// Store `artifact`, replacing any previous record for its identity.
    async fn put(&self, artifact: &ConfigurationArtifact) -> LiveUpdateResult<()>;

    /// Drop the record for `id`. Returns true if one existed.
    async fn remove(&self, id: &ConfigurationIdentity) -> LiveUpdateResult<bool>;

    /// Usage statistics since the store was created.
    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned a live artifact.
    pub hits: u64,
    /// Lookups that found no record.
    pub misses: u64,
    /// Lookups that found a record past its expiration.
    pub expired: u64,
    /// Lookups that found an unreadable or corrupt record.
    pub invalid: u64,
    /// Successful writes.
    pub writes: u64,
    /// Failed writes.
    pub write_failures: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0) over all lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses + self.expired + self.invalid
    }
}

/// Lock-free counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    invalid: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_lookup(&self, lookup: &Lookup) {
        let counter = match lookup {
            Lookup::Hit(_) => &self.hits,
            Lookup::Miss => &self.misses,
            Lookup::Expired { .. } => &self.expired,
            Lookup::Invalid { .. } => &self.invalid,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, ok: bool) {
        let counter = if ok {
            &self.writes
        } else {
            &self.write_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}
