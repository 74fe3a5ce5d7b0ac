//! Service endpoint resolution.

use liveupdate_core::{encode_segment, ConfigError, ConfigurationRequest, LiveUpdateConfig};
use reqwest::Url;

/// Path of the LiveUpdate service, relative to the server's context root.
pub const SERVICE_PATH_PREFIX: &str = "/mfpliveupdate/v1";

/// Base URL of the configuration resource for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    base: String,
}

impl ServiceEndpoint {
    /// Use `service_url` as the configuration resource verbatim.
    pub fn parse(service_url: &str) -> Result<Self, ConfigError> {
        let url = parse_http_url("service_url", service_url)?;
        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint named by engine configuration. An explicit `service_url`
    /// wins; otherwise it is derived from `server_url` and `application_id`.
    pub fn from_config(config: &LiveUpdateConfig) -> Result<Self, ConfigError> {
        let given = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        match (given(&config.service_url), given(&config.server_url)) {
            (Some(service_url), _) => Self::parse(&service_url),
            (None, Some(server_url)) => Self::from_server_url(
                &server_url,
                config.application_id.as_deref().unwrap_or_default(),
            ),
            (None, None) => Err(ConfigError::MissingRequired {
                field: "service_url".to_string(),
            }),
        }
    }

    /// Derive the configuration resource from the server URL of the
    /// platform client and the application id.
    ///
    /// Scheme, host, and port are kept. The path is cut at the first `/api`
    /// and its last segment dropped, so `http://host:9080/mfp/api` yields
    /// `http://host:9080/mfpliveupdate/v1/<app>/configuration`.
    pub fn from_server_url(server_url: &str, application_id: &str) -> Result<Self, ConfigError> {
        let url = parse_http_url("server_url", server_url)?;
        let host = url.host_str().ok_or_else(|| ConfigError::InvalidValue {
            field: "server_url".to_string(),
            value: server_url.to_string(),
            reason: "missing host".to_string(),
        })?;

        let application_id = application_id.trim();
        if application_id.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "application_id".to_string(),
            });
        }

        let path = url.path();
        let before_api = path.split("/api").next().unwrap_or(path);
        let context_root = before_api
            .rfind('/')
            .map(|idx| &before_api[..idx])
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "server_url".to_string(),
                value: server_url.to_string(),
                reason: "path has no context root".to_string(),
            })?;

        let mut route = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            route.push(':');
            route.push_str(&port.to_string());
        }
        route.push_str(context_root);

        let service_url = format!(
            "{}{}/{}/configuration",
            route,
            SERVICE_PATH_PREFIX,
            encode_segment(application_id)
        );
        Self::parse(&service_url)
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    /// URL a request is sent to. Parameter requests go to the base URL and
    /// carry their parameters as query pairs.
    pub fn url_for(&self, request: &ConfigurationRequest) -> String {
        match request {
            ConfigurationRequest::Segment(segment) => {
                format!("{}/{}", self.base, encode_segment(segment))
            }
            ConfigurationRequest::Params(_) => self.base.clone(),
        }
    }
}

fn parse_http_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveupdate_core::ConfigurationParams;

    #[test]
    fn test_from_server_url_drops_context_segment() {
        let endpoint =
            ServiceEndpoint::from_server_url("http://localhost:9080/mfp/api", "com.example.app")
                .expect("valid server url");
        assert_eq!(
            endpoint.as_str(),
            "http://localhost:9080/mfpliveupdate/v1/com.example.app/configuration"
        );
    }

    #[test]
    fn test_from_server_url_keeps_outer_path() {
        let endpoint = ServiceEndpoint::from_server_url("https://mobile.example.com/tenant/mfp/api/", "app")
            .expect("valid server url");
        assert_eq!(
            endpoint.as_str(),
            "https://mobile.example.com/tenant/mfpliveupdate/v1/app/configuration"
        );
    }

    #[test]
    fn test_from_server_url_rejects_bad_input() {
        assert!(matches!(
            ServiceEndpoint::from_server_url("not a url", "app"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            ServiceEndpoint::from_server_url("ftp://host/mfp/api", "app"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            ServiceEndpoint::from_server_url("http://host/mfp/api", " "),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_from_config_prefers_service_url() {
        let config = LiveUpdateConfig::for_server(
            "http://localhost:9080/mfp/api",
            "com.example.app",
            "/tmp/cache",
        );
        let endpoint = ServiceEndpoint::from_config(&config).expect("derived");
        assert_eq!(
            endpoint.as_str(),
            "http://localhost:9080/mfpliveupdate/v1/com.example.app/configuration"
        );

        let mut explicit = config.clone();
        explicit.service_url = Some("https://other.test/configuration".to_string());
        let endpoint = ServiceEndpoint::from_config(&explicit).expect("explicit");
        assert_eq!(endpoint.as_str(), "https://other.test/configuration");

        let mut missing_app = config;
        missing_app.application_id = None;
        assert!(matches!(
            ServiceEndpoint::from_config(&missing_app),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_url_for_requests() {
        let endpoint = ServiceEndpoint::parse("https://host/svc/configuration/").expect("valid");
        assert_eq!(endpoint.as_str(), "https://host/svc/configuration");

        assert_eq!(
            endpoint.url_for(&ConfigurationRequest::segment("18")),
            "https://host/svc/configuration/18"
        );
        assert_eq!(
            endpoint.url_for(&ConfigurationRequest::segment("vip/users")),
            "https://host/svc/configuration/vip%2Fusers"
        );
        assert_eq!(
            endpoint.url_for(&ConfigurationRequest::all()),
            "https://host/svc/configuration/all"
        );

        let mut params = ConfigurationParams::new();
        params.insert("lat".to_string(), "35.13E".to_string());
        assert_eq!(
            endpoint.url_for(&ConfigurationRequest::params(params)),
            "https://host/svc/configuration"
        );
    }
}
