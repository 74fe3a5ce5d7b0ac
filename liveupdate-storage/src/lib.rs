//! LiveUpdate Storage - Persistent Configuration Cache
//!
//! Stores the last fetched configuration per identity together with its
//! expiration, and answers lookups under a single store-wide guard.

pub mod cache;

pub use cache::{
    CachePolicy, CacheStats, CacheStore, FileCacheStore, Lookup, MemoryCacheStore, RecordKey,
    METADATA_FILE, PAYLOAD_FILE,
};
