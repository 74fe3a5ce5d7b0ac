//! Remote configuration fetcher.

use async_trait::async_trait;
use liveupdate_core::{
    ConfigurationArtifact, ConfigurationIdentity, ConfigurationRequest, LiveUpdateConfig,
    LiveUpdateResult, DEFAULT_CLIENT_SCOPE,
};

use crate::endpoint::ServiceEndpoint;
use crate::transport::{HttpTransport, ResourceRequest, Transport};

/// Obtains a fresh artifact for a request.
///
/// Implementors issue at most one remote call per `fetch` and never consult
/// the cache.
#[async_trait]
pub trait ConfigurationFetcher: Send + Sync {
    async fn fetch(
        &self,
        id: &ConfigurationIdentity,
        request: &ConfigurationRequest,
    ) -> LiveUpdateResult<ConfigurationArtifact>;
}

/// Fetcher backed by the LiveUpdate configuration service.
#[derive(Debug)]
pub struct RemoteFetcher<T: Transport> {
    transport: T,
    endpoint: ServiceEndpoint,
    scope: String,
}

impl<T: Transport> RemoteFetcher<T> {
    pub fn new(transport: T, endpoint: ServiceEndpoint) -> Self {
        Self {
            transport,
            endpoint,
            scope: DEFAULT_CLIENT_SCOPE.to_string(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The GET a request translates to.
    pub fn resource_request(&self, request: &ConfigurationRequest) -> ResourceRequest {
        let mut resource = ResourceRequest::new(self.endpoint.url_for(request), self.scope.as_str());
        if let ConfigurationRequest::Params(params) = request {
            for (key, value) in params {
                resource = resource.with_query_param(key.as_str(), value.as_str());
            }
        }
        resource
    }
}

impl RemoteFetcher<HttpTransport> {
    /// Build an HTTP-backed fetcher from engine configuration.
    pub fn from_config(config: &LiveUpdateConfig) -> LiveUpdateResult<Self> {
        let endpoint = ServiceEndpoint::from_config(config)?;
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(transport, endpoint).with_scope(config.client_scope.as_str()))
    }
}

#[async_trait]
impl<T: Transport> ConfigurationFetcher for RemoteFetcher<T> {
    async fn fetch(
        &self,
        id: &ConfigurationIdentity,
        request: &ConfigurationRequest,
    ) -> LiveUpdateResult<ConfigurationArtifact> {
        let resource = self.resource_request(request);
        tracing::debug!(identity = %id, url = %resource.url, "Requesting configuration");
        tracing::trace!(identity = %id, query = ?resource.query, scope = %resource.scope, "Request detail");

        let body = match self.transport.get_json(&resource).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(
                    identity = %id,
                    status = e.status(),
                    error = %e,
                    "Configuration request failed"
                );
                return Err(e.into());
            }
        };

        let (artifact, anomaly) = ConfigurationArtifact::from_response(id.clone(), body.as_ref());
        if let Some(e) = anomaly {
            tracing::error!(identity = %id, error = %e, "Invalid configuration response");
        }
        if artifact.expires_at().is_none() {
            tracing::debug!(identity = %id, "Response carries no usable expiration");
        }
        tracing::trace!(identity = %id, configuration = ?artifact.configuration(), "Received configuration");

        Ok(artifact)
    }
}
