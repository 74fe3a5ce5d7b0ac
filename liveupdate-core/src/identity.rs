//! Request and identity types for configuration lookups.
//!
//! A request selects a configuration either by segment or by a parameter set.
//! The identity derived from it addresses both the remote request and the
//! cache record, so two requests with the same identity share one record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Segment used when a request names neither a segment nor parameters.
pub const DEFAULT_SEGMENT: &str = "all";

/// Parameter set sent as query pairs. Sorted, so identity derivation is
/// stable across runs.
pub type ConfigurationParams = BTreeMap<String, String>;

/// What the caller asks the service for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigurationRequest {
    /// Direct lookup of a server-defined segment.
    Segment(String),
    /// Lookup by key/value pairs evaluated by the server.
    Params(ConfigurationParams),
}

impl ConfigurationRequest {
    /// Request for a single segment.
    pub fn segment(segment_id: impl Into<String>) -> Self {
        Self::Segment(segment_id.into())
    }

    /// Request for the default segment.
    pub fn all() -> Self {
        Self::Segment(DEFAULT_SEGMENT.to_string())
    }

    /// Request by parameter set. An empty set degenerates to the default
    /// segment.
    pub fn params(params: ConfigurationParams) -> Self {
        if params.is_empty() {
            Self::all()
        } else {
            Self::Params(params)
        }
    }

    /// Combine the optional segment and parameter set a caller supplied.
    ///
    /// Non-empty parameters take precedence over the segment.
    pub fn from_parts(segment_id: Option<&str>, params: ConfigurationParams) -> Self {
        if !params.is_empty() {
            return Self::Params(params);
        }
        match segment_id {
            Some(segment) => Self::segment(segment),
            None => Self::all(),
        }
    }

    /// Returns true for segment requests.
    pub fn is_segment(&self) -> bool {
        matches!(self, Self::Segment(_))
    }
}

/// Stable key for a configuration request and its cache record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationIdentity(String);

impl ConfigurationIdentity {
    /// Derive the identity of a request. Same rule as [`build_identity`].
    pub fn for_request(request: &ConfigurationRequest) -> Self {
        match request {
            ConfigurationRequest::Segment(segment) => {
                build_identity(Some(segment), &ConfigurationParams::new())
            }
            ConfigurationRequest::Params(params) => build_identity(None, params),
        }
    }

    /// Identity of a segment request: the percent-encoded segment.
    pub fn from_segment(segment: &str) -> Self {
        Self(encode_segment(segment))
    }

    /// Identity of a parameter request: `_key_value` per entry, in key order.
    pub fn from_params(params: &ConfigurationParams) -> Self {
        let mut id = String::new();
        for (key, value) in params {
            id.push('_');
            id.push_str(key);
            id.push('_');
            id.push_str(value);
        }
        Self(id)
    }

    /// Rehydrate an identity from its string form.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ConfigurationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConfigurationIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build an identity from the raw parts of a request.
///
/// Non-empty `params` win over `segment_id`; with neither, the default
/// segment is used. Never fails.
pub fn build_identity(segment_id: Option<&str>, params: &ConfigurationParams) -> ConfigurationIdentity {
    if !params.is_empty() {
        return ConfigurationIdentity::from_params(params);
    }
    ConfigurationIdentity::from_segment(segment_id.unwrap_or(DEFAULT_SEGMENT))
}

/// Percent-encode a segment so it is safe as a single URL path component.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
