//! HTTP transport for configuration requests.

use std::time::Duration;

use async_trait::async_trait;
use liveupdate_core::{ConfigError, FetchError, LiveUpdateConfig, LiveUpdateResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;

/// Header carrying the OAuth scope the request is made under.
pub const SCOPE_HEADER: &str = "x-liveupdate-scope";

/// One protected GET against the configuration service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub scope: String,
}

impl ResourceRequest {
    pub fn new(url: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            scope: scope.into(),
        }
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Sends resource requests and returns the decoded JSON body.
///
/// `Ok(None)` means the service answered 2xx without a usable JSON body.
/// Non-2xx answers and network failures are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, request: &ResourceRequest) -> Result<Option<Value>, FetchError>;
}

/// [`Transport`] over `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    auth_headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(timeout: Duration, access_token: Option<&str>) -> LiveUpdateResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "request_timeout_ms".to_string(),
                value: timeout.as_millis().to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            auth_headers: build_auth_headers(access_token)?,
        })
    }

    pub fn from_config(config: &LiveUpdateConfig) -> LiveUpdateResult<Self> {
        Self::new(config.request_timeout(), config.access_token.as_deref())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, request: &ResourceRequest) -> Result<Option<Value>, FetchError> {
        let mut builder = self
            .client
            .get(&request.url)
            .headers(self.auth_headers.clone())
            .header(SCOPE_HEADER, request.scope.as_str());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send().await.map_err(|e| FetchError::Transport {
            url: request.url.clone(),
            reason: format!("HTTP request failed: {}", e),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| FetchError::Transport {
            url: request.url.clone(),
            reason: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            let message = if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                text
            };
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "Response body is not JSON");
                Ok(None)
            }
        }
    }
}

fn build_auth_headers(access_token: Option<&str>) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = access_token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            ConfigError::InvalidValue {
                field: "access_token".to_string(),
                value: "[REDACTED]".to_string(),
                reason: e.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = if self.auth_headers.contains_key(AUTHORIZATION) {
            "[REDACTED]"
        } else {
            "none"
        };
        f.debug_struct("HttpTransport")
            .field("authorization", &auth)
            .finish()
    }
}
