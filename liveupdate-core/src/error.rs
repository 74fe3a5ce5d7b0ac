//! Error types for LiveUpdate operations

use thiserror::Error;

/// Identity derivation errors.
///
/// Building an identity cannot currently fail; the variant set is kept so
/// that request validation has a home once it exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid identity component {component}: {reason}")]
    InvalidComponent { component: String, reason: String },
}

/// Remote fetch errors. These are the only failures a resolve surfaces.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Request to {url} failed with status {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
}

impl FetchError {
    /// HTTP status carried by the error, or 0 when the request never got a
    /// response.
    pub fn status(&self) -> u16 {
        match self {
            Self::Transport { .. } => 0,
            Self::Status { status, .. } => *status,
        }
    }

    /// Human-readable message without the URL prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { reason, .. } => reason,
            Self::Status { message, .. } => message,
        }
    }
}

/// Malformed server responses. Absorbed into an empty configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedResponseError {
    #[error("Response body is missing or is not a JSON object")]
    MissingBody,

    #[error("Response data is invalid: {reason}")]
    InvalidData { reason: String },
}

/// Cache storage errors. Reads degrade to a miss, writes are dropped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache I/O failed at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Cache serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },
}

/// Inbound request errors raised while reading caller options.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid JSON format for options")]
    EmptyOptions,

    #[error("Invalid JSON format for options: {reason}")]
    InvalidJson { reason: String },
}

/// Master error type for all LiveUpdate errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiveUpdateError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] MalformedResponseError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),
}

/// Result type alias for LiveUpdate operations.
pub type LiveUpdateResult<T> = Result<T, LiveUpdateError>;

// =============================================================================
// TESTS
// =============================================================================
