//! File-backed cache store.
//!
//! Each identity owns a directory under the cache root holding two JSON
//! documents:
//!
//! - `configuration.json`: the `features` / `properties` payload
//! - `metadata.json`: `{"expiresAt": "<RFC 1123 GMT date>"}`
//!
//! Expiration is decided from the metadata alone, so an expired record is
//! rejected without loading its payload.
//!
//! # Write ordering
//!
//! `put` removes the old metadata, replaces the payload, and writes the new
//! metadata last. Both files are written to a temporary name and renamed
//! into place. An interrupted write therefore leaves at worst a payload
//! without metadata, which reads as invalid and triggers a refetch.
//!
//! # Thread Safety
//!
//! One store-wide async mutex serializes every `get`, `put`, and `remove`.
//! Only one operation is in flight at a time across all identities.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use liveupdate_core::{
    format_expires_at, parse_expires_at, CacheError, Configuration, ConfigurationArtifact,
    ConfigurationIdentity, LiveUpdateResult, Timestamp, EXPIRES_AT_KEY,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::freshness::Lookup;
use super::record_key::RecordKey;
use super::traits::{CacheStats, CacheStore, StatsCounters};

/// Contents of `metadata.json`.
#[derive(Debug, Serialize, Deserialize)]
struct MetadataDocument {
    #[serde(rename = "expiresAt")]
    expires_at: String,
}

/// Durable cache store rooted at an application-private directory.
#[derive(Debug)]
pub struct FileCacheStore {
    root: PathBuf,
    guard: Mutex<()>,
    stats: StatsCounters,
}

impl FileCacheStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            guard: Mutex::new(()),
            stats: StatsCounters::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the record for `id`.
    pub fn record_dir(&self, id: &ConfigurationIdentity) -> PathBuf {
        RecordKey::new(id).dir(&self.root)
    }

    async fn read_record(&self, id: &ConfigurationIdentity, now: Timestamp) -> Lookup {
        let key = RecordKey::new(id);

        let metadata_path = key.metadata_path(&self.root);
        let metadata = match read_optional(&metadata_path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                // A payload with no metadata is treated as expired; anything
                // else is a plain miss.
                return match tokio::fs::try_exists(key.payload_path(&self.root)).await {
                    Ok(true) => Lookup::Invalid {
                        reason: "payload present without metadata".to_string(),
                    },
                    _ => Lookup::Miss,
                };
            }
            Err(e) => return Lookup::Invalid { reason: e.to_string() },
        };

        let expires_at = match serde_json::from_slice::<MetadataDocument>(&metadata) {
            Ok(doc) => match parse_expires_at(&doc.expires_at) {
                Some(ts) => ts,
                None => {
                    return Lookup::Invalid {
                        reason: format!("unparseable {}: {}", EXPIRES_AT_KEY, doc.expires_at),
                    }
                }
            },
            Err(e) => {
                return Lookup::Invalid {
                    reason: format!("unreadable metadata: {}", e),
                }
            }
        };

        if expires_at <= now {
            return Lookup::Expired { expires_at };
        }

        let payload_path = key.payload_path(&self.root);
        let payload = match read_optional(&payload_path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Lookup::Invalid {
                    reason: "metadata present without payload".to_string(),
                }
            }
            Err(e) => return Lookup::Invalid { reason: e.to_string() },
        };

        match serde_json::from_slice::<Configuration>(&payload) {
            Ok(configuration) => Lookup::Hit(ConfigurationArtifact::new(
                id.clone(),
                configuration,
                Some(expires_at),
            )),
            Err(e) => Lookup::Invalid {
                reason: format!("unreadable payload: {}", e),
            },
        }
    }

    async fn write_record(&self, artifact: &ConfigurationArtifact) -> Result<(), CacheError> {
        let key = RecordKey::new(artifact.id());
        let dir = key.dir(&self.root);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let metadata_path = key.metadata_path(&self.root);
        match tokio::fs::remove_file(&metadata_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&metadata_path, e)),
        }

        let payload = serde_json::to_vec(artifact.configuration()).map_err(|e| {
            CacheError::Serialization {
                reason: e.to_string(),
            }
        })?;
        write_atomic(&key.payload_path(&self.root), &payload).await?;

        // Without an expiration the record stays metadata-less and reads as
        // expired.
        if let Some(expires_at) = artifact.expires_at() {
            let doc = MetadataDocument {
                expires_at: format_expires_at(expires_at),
            };
            let metadata = serde_json::to_vec(&doc).map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
            write_atomic(&metadata_path, &metadata).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn lookup_at(&self, id: &ConfigurationIdentity, now: Timestamp) -> Lookup {
        let lookup = {
            let _guard = self.guard.lock().await;
            self.read_record(id, now).await
        };

        match &lookup {
            Lookup::Invalid { reason } => {
                tracing::warn!(identity = %id, reason = %reason, "Ignoring unusable cache record");
            }
            other => {
                tracing::debug!(identity = %id, outcome = other.label(), "Cache lookup");
            }
        }
        self.stats.record_lookup(&lookup);
        lookup
    }

    async fn put(&self, artifact: &ConfigurationArtifact) -> LiveUpdateResult<()> {
        let result = {
            let _guard = self.guard.lock().await;
            self.write_record(artifact).await
        };

        self.stats.record_write(result.is_ok());
        match &result {
            Ok(()) => tracing::trace!(identity = %artifact.id(), "Cache record written"),
            Err(e) => tracing::warn!(identity = %artifact.id(), error = %e, "Cache write failed"),
        }
        result.map_err(Into::into)
    }

    async fn remove(&self, id: &ConfigurationIdentity) -> LiveUpdateResult<bool> {
        let dir = self.record_dir(id);
        let _guard = self.guard.lock().await;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&dir, e).into()),
        }
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

/// Read a file, mapping "not found" to `None`.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, CacheError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("record");
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::now_v7()));

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_error(&tmp, e));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_error(path, e));
    }
    Ok(())
}

fn io_error(path: &Path, e: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
