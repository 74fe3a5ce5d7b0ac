//! LiveUpdate Core - Configuration Types
//!
//! Data structures shared by every LiveUpdate crate: request identities,
//! configuration payloads, expiration timestamps, engine configuration, and
//! the error taxonomy. No I/O beyond reading a config file.

pub mod config;
pub mod configuration;
pub mod error;
pub mod expiry;
pub mod identity;

pub use config::{LiveUpdateConfig, PersistMode, DEFAULT_CLIENT_SCOPE, DEFAULT_REQUEST_TIMEOUT_MS};
pub use configuration::{
    Configuration, ConfigurationArtifact, DATA_KEY, EXPIRES_AT_KEY, FEATURES_KEY, PROPERTIES_KEY,
};
pub use error::{
    CacheError, ConfigError, FetchError, IdentityError, LiveUpdateError, LiveUpdateResult,
    MalformedResponseError, RequestError,
};
pub use expiry::{format_expires_at, is_expired, parse_expires_at, Timestamp};
pub use identity::{
    build_identity, encode_segment, ConfigurationIdentity, ConfigurationParams,
    ConfigurationRequest, DEFAULT_SEGMENT,
};
