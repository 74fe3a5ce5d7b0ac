//! Resolution coordinator.
//!
//! Decides between the cache and the remote service for each request:
//!
//! 1. derive the identity of the request
//! 2. with caching allowed, return a live cached artifact if there is one
//! 3. otherwise fetch, persist the result best-effort, and return it
//!
//! A failed fetch is returned as-is. Nothing is written and no stale cached
//! value is served in its place.

use std::sync::Arc;

use liveupdate_client::{ConfigurationFetcher, HttpTransport, RemoteFetcher};
use liveupdate_core::{
    Configuration, ConfigurationArtifact, ConfigurationIdentity, ConfigurationParams,
    ConfigurationRequest, LiveUpdateConfig, LiveUpdateResult, PersistMode,
};
use liveupdate_storage::{CachePolicy, CacheStore, FileCacheStore};
use serde_json::Value;

use crate::options::{FailureReport, ResolveOptions};

/// Resolver wired to the on-disk store and the HTTP service.
pub type DefaultResolver = Resolver<FileCacheStore, RemoteFetcher<HttpTransport>>;

/// Answers configuration requests from the cache or the remote service.
#[derive(Debug)]
pub struct Resolver<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    persist_mode: PersistMode,
}

impl<S, F> Clone for Resolver<S, F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            persist_mode: self.persist_mode,
        }
    }
}

impl DefaultResolver {
    /// Build a resolver from validated engine configuration.
    pub fn from_config(config: &LiveUpdateConfig) -> LiveUpdateResult<Self> {
        config.validate()?;
        let store = FileCacheStore::new(config.cache_root.clone());
        let fetcher = RemoteFetcher::from_config(config)?;
        Ok(Resolver::new(Arc::new(store), Arc::new(fetcher)).with_persist_mode(config.persist_mode))
    }
}

impl<S, F> Resolver<S, F>
where
    S: CacheStore + 'static,
    F: ConfigurationFetcher,
{
    pub fn new(store: Arc<S>, fetcher: Arc<F>) -> Self {
        Self {
            store,
            fetcher,
            persist_mode: PersistMode::default(),
        }
    }

    pub fn with_persist_mode(mut self, persist_mode: PersistMode) -> Self {
        self.persist_mode = persist_mode;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    pub fn persist_mode(&self) -> PersistMode {
        self.persist_mode
    }

    /// Resolve `request`, consulting the cache first when `policy` allows.
    pub async fn resolve(
        &self,
        request: &ConfigurationRequest,
        policy: impl Into<CachePolicy>,
    ) -> LiveUpdateResult<ConfigurationArtifact> {
        let policy = policy.into();
        let id = ConfigurationIdentity::for_request(request);

        if policy.allows_cache() {
            if let Some(artifact) = self.store.get(&id).await {
                tracing::debug!(identity = %id, "Serving cached configuration");
                return Ok(artifact);
            }
        }

        tracing::debug!(identity = %id, policy = ?policy, "Fetching configuration");
        let artifact = self.fetcher.fetch(&id, request).await?;
        self.persist(&artifact).await;
        Ok(artifact)
    }

    pub async fn resolve_segment(
        &self,
        segment_id: &str,
        policy: impl Into<CachePolicy>,
    ) -> LiveUpdateResult<ConfigurationArtifact> {
        self.resolve(&ConfigurationRequest::segment(segment_id), policy)
            .await
    }

    /// Resolve by parameter set. An empty set resolves the default segment.
    pub async fn resolve_params(
        &self,
        params: ConfigurationParams,
        policy: impl Into<CachePolicy>,
    ) -> LiveUpdateResult<ConfigurationArtifact> {
        self.resolve(&ConfigurationRequest::params(params), policy)
            .await
    }

    pub async fn resolve_all(
        &self,
        policy: impl Into<CachePolicy>,
    ) -> LiveUpdateResult<ConfigurationArtifact> {
        self.resolve(&ConfigurationRequest::all(), policy).await
    }

    /// Resolve caller options and return only the payload.
    pub async fn resolve_options(&self, options: &ResolveOptions) -> LiveUpdateResult<Configuration> {
        let artifact = self
            .resolve(&options.request(), options.cache_policy())
            .await?;
        Ok(artifact.into_configuration())
    }

    /// Resolve options given as JSON text.
    ///
    /// Success yields the `{features, properties}` object; every failure,
    /// including unparseable options, yields a [`FailureReport`].
    pub async fn resolve_options_json(&self, raw: &str) -> Result<Value, FailureReport> {
        let options = ResolveOptions::from_json_str(raw).map_err(FailureReport::from)?;
        self.resolve_options(&options)
            .await
            .map(|configuration| configuration.to_json())
            .map_err(FailureReport::from)
    }

    /// Drop the cached record for `request` so the next resolve fetches.
    pub async fn invalidate(&self, request: &ConfigurationRequest) -> LiveUpdateResult<bool> {
        let id = ConfigurationIdentity::for_request(request);
        let removed = self.store.remove(&id).await?;
        let stats = self.store.stats();
        tracing::debug!(
            identity = %id,
            removed,
            lookups = stats.lookups(),
            hit_rate = stats.hit_rate(),
            "Cache record invalidated"
        );
        Ok(removed)
    }

    async fn persist(&self, artifact: &ConfigurationArtifact) {
        match self.persist_mode {
            PersistMode::Inline => persist_best_effort(&*self.store, artifact).await,
            PersistMode::Detached => {
                let store = Arc::clone(&self.store);
                let artifact = artifact.clone();
                tokio::spawn(async move {
                    persist_best_effort(&*store, &artifact).await;
                });
            }
        }
    }
}

async fn persist_best_effort<S: CacheStore + ?Sized>(store: &S, artifact: &ConfigurationArtifact) {
    if let Err(e) = store.put(artifact).await {
        tracing::warn!(identity = %artifact.id(), error = %e, "Failed to persist configuration");
    }
}
