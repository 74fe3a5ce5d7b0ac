//! Engine configuration.
//!
//! Loaded from TOML, then overridden from `LIVEUPDATE_*` environment
//! variables, then validated. `cache_root` has no default. The service is
//! addressed either by a full `service_url` or by the platform `server_url`
//! plus the `application_id`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, LiveUpdateResult};

/// Authentication scope requested for configuration fetches.
pub const DEFAULT_CLIENT_SCOPE: &str = "liveupdate.mobileclient";

/// Default request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// How the resolver persists a freshly fetched artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Finish the write before returning, so the next identical resolve
    /// is served from the cache.
    #[default]
    Inline,
    /// Spawn the write and return to the caller immediately. An identical
    /// resolve issued before the write lands fetches again.
    Detached,
}

impl PersistMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "detached" => Some(Self::Detached),
            "inline" => Some(Self::Inline),
            _ => None,
        }
    }
}

/// Master configuration for the engine.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveUpdateConfig {
    /// Base URL of the configuration service, ending in `/configuration`.
    /// Takes precedence over `server_url`.
    #[serde(default)]
    pub service_url: Option<String>,
    /// Server URL of the platform client, e.g. `https://host/mfp/api`.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Application id the service URL is derived for.
    #[serde(default)]
    pub application_id: Option<String>,
    /// Directory holding cache records. Should be application-private.
    pub cache_root: PathBuf,
    #[serde(default = "default_client_scope")]
    pub client_scope: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Bearer token sent with every request, if any.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub persist_mode: PersistMode,
}

impl std::fmt::Debug for LiveUpdateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveUpdateConfig")
            .field("service_url", &self.service_url)
            .field("server_url", &self.server_url)
            .field("application_id", &self.application_id)
            .field("cache_root", &self.cache_root)
            .field("client_scope", &self.client_scope)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("persist_mode", &self.persist_mode)
            .finish()
    }
}

fn default_client_scope() -> String {
    DEFAULT_CLIENT_SCOPE.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl LiveUpdateConfig {
    /// Configuration addressing the service by its full URL.
    pub fn new(service_url: impl Into<String>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            service_url: Some(service_url.into()),
            ..Self::empty(cache_root.into())
        }
    }

    /// Configuration whose service URL is derived from the platform server
    /// URL and the application id.
    pub fn for_server(
        server_url: impl Into<String>,
        application_id: impl Into<String>,
        cache_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            server_url: Some(server_url.into()),
            application_id: Some(application_id.into()),
            ..Self::empty(cache_root.into())
        }
    }

    fn empty(cache_root: PathBuf) -> Self {
        Self {
            service_url: None,
            server_url: None,
            application_id: None,
            cache_root,
            client_scope: default_client_scope(),
            request_timeout_ms: default_request_timeout_ms(),
            access_token: None,
            persist_mode: PersistMode::default(),
        }
    }

    /// Load from a TOML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> LiveUpdateResult<Self> {
        let mut config = Self::from_path(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> LiveUpdateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> LiveUpdateResult<Self> {
        let config: LiveUpdateConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Override fields from environment variables.
    ///
    /// - `LIVEUPDATE_SERVICE_URL`
    /// - `LIVEUPDATE_SERVER_URL`
    /// - `LIVEUPDATE_APPLICATION_ID`
    /// - `LIVEUPDATE_CACHE_ROOT`
    /// - `LIVEUPDATE_CLIENT_SCOPE`
    /// - `LIVEUPDATE_REQUEST_TIMEOUT_MS`
    /// - `LIVEUPDATE_ACCESS_TOKEN`
    /// - `LIVEUPDATE_PERSIST_MODE` (`detached` or `inline`)
    pub fn apply_env_overrides(&mut self) -> LiveUpdateResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from an arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> LiveUpdateResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LIVEUPDATE_SERVICE_URL") {
            self.service_url = Some(url);
        }
        if let Some(url) = lookup("LIVEUPDATE_SERVER_URL") {
            self.server_url = Some(url);
        }
        if let Some(app) = lookup("LIVEUPDATE_APPLICATION_ID") {
            self.application_id = Some(app);
        }
        if let Some(root) = lookup("LIVEUPDATE_CACHE_ROOT") {
            self.cache_root = PathBuf::from(root);
        }
        if let Some(scope) = lookup("LIVEUPDATE_CLIENT_SCOPE") {
            self.client_scope = scope;
        }
        if let Some(raw) = lookup("LIVEUPDATE_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "request_timeout_ms".to_string(),
                value: raw.clone(),
                reason: "must be an integer number of milliseconds".to_string(),
            })?;
        }
        if let Some(token) = lookup("LIVEUPDATE_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(raw) = lookup("LIVEUPDATE_PERSIST_MODE") {
            self.persist_mode = PersistMode::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                field: "persist_mode".to_string(),
                value: raw.clone(),
                reason: "must be 'detached' or 'inline'".to_string(),
            })?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> LiveUpdateResult<()> {
        match (
            non_blank(&self.service_url),
            non_blank(&self.server_url),
            non_blank(&self.application_id),
        ) {
            (Some(url), _, _) => require_http("service_url", url)?,
            (None, Some(url), Some(_)) => require_http("server_url", url)?,
            (None, Some(_), None) => {
                return Err(ConfigError::MissingRequired {
                    field: "application_id".to_string(),
                }
                .into())
            }
            (None, None, _) => {
                return Err(ConfigError::MissingRequired {
                    field: "service_url".to_string(),
                }
                .into())
            }
        }
        if self.cache_root.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "cache_root".to_string(),
            }
            .into());
        }
        if self.client_scope.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "client_scope".to_string(),
                value: self.client_scope.clone(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms".to_string(),
                value: self.request_timeout_ms.to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        if matches!(&self.access_token, Some(token) if token.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "access_token".to_string(),
                value: String::new(),
                reason: "must not be blank when set".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn require_http(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: url.to_string(),
            reason: "must be an http or https URL".to_string(),
        })
    }
}
