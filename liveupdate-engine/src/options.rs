//! Caller-facing options and failure reports.
//!
//! Hosts pass options as a JSON object:
//!
//! ```json
//! {"segmentId": "vip", "useClientCache": true}
//! {"params": {"lat": "35.13E", "visits": 3}, "useClientCache": false}
//! ```

use liveupdate_core::{
    ConfigurationParams, ConfigurationRequest, LiveUpdateError, LiveUpdateResult, RequestError,
};
use liveupdate_storage::CachePolicy;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Options for one resolve call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOptions {
    #[serde(default)]
    pub segment_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_params")]
    pub params: ConfigurationParams,
    #[serde(default = "default_use_client_cache", deserialize_with = "deserialize_use_cache")]
    pub use_client_cache: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            segment_id: None,
            params: ConfigurationParams::new(),
            use_client_cache: default_use_client_cache(),
        }
    }
}

fn default_use_client_cache() -> bool {
    true
}

impl ResolveOptions {
    /// Parse options from their JSON text.
    pub fn from_json_str(raw: &str) -> LiveUpdateResult<Self> {
        if raw.trim().is_empty() {
            return Err(RequestError::EmptyOptions.into());
        }
        serde_json::from_str(raw).map_err(|e| {
            RequestError::InvalidJson {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// The request these options describe. Non-empty parameters win over
    /// the segment.
    pub fn request(&self) -> ConfigurationRequest {
        ConfigurationRequest::from_parts(self.segment_id.as_deref(), self.params.clone())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from(self.use_client_cache)
    }
}

/// Parameter values arrive as arbitrary JSON; strings are kept verbatim and
/// everything else is rendered as its JSON text.
fn deserialize_params<'de, D>(deserializer: D) -> Result<ConfigurationParams, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Map<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

/// Accepts a boolean or `"true"`/`"false"`; anything else keeps the cache on.
fn deserialize_use_cache<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Bool(b) => b,
        Value::String(s) if s.eq_ignore_ascii_case("false") => false,
        _ => true,
    })
}

/// What a failed resolve reports to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// HTTP status of the failed request, 0 when there was none.
    pub status: u16,
    #[serde(rename = "errorMsg")]
    pub error_msg: String,
}

impl From<&LiveUpdateError> for FailureReport {
    fn from(err: &LiveUpdateError) -> Self {
        match err {
            LiveUpdateError::Fetch(fetch) => Self {
                status: fetch.status(),
                error_msg: fetch.message().to_string(),
            },
            LiveUpdateError::Request(request) => Self {
                status: 0,
                error_msg: request.to_string(),
            },
            other => Self {
                status: 0,
                error_msg: other.to_string(),
            },
        }
    }
}

impl From<LiveUpdateError> for FailureReport {
    fn from(err: LiveUpdateError) -> Self {
        Self::from(&err)
    }
}
