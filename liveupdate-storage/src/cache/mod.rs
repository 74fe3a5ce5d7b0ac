//! Configuration cache with explicit expiration semantics.
//!
//! A cached artifact is served only while its `expiresAt` lies strictly in
//! the future. Anything else (missing, expired, unreadable) is reported as a
//! [`Lookup`] variant and surfaces to the resolver as "no cached value".
//!
//! # Example
//!
//! ```ignore
//! let store = FileCacheStore::new("/data/app/liveupdate");
//! if let Some(artifact) = store.get(&identity).await {
//!     return Ok(artifact.into_configuration());
//! }
//! ```

pub mod file_store;
pub mod freshness;
pub mod memory_store;
pub mod record_key;
pub mod traits;

pub use file_store::FileCacheStore;
pub use freshness::{CachePolicy, Lookup};
pub use memory_store::MemoryCacheStore;
pub use record_key::{RecordKey, METADATA_FILE, PAYLOAD_FILE};
pub use traits::{CacheStats, CacheStore};
