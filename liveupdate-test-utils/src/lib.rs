//! LiveUpdate Test Utilities
//!
//! Shared test infrastructure for the LiveUpdate workspace:
//! - Mock fetcher with scripted answers and call recording
//! - Store wrapper that counts operations and can inject write failures
//! - Fixtures for configurations, artifacts, and service response bodies

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

pub use liveupdate_client::ConfigurationFetcher;
pub use liveupdate_core::{
    format_expires_at, CacheError, Configuration, ConfigurationArtifact, ConfigurationIdentity,
    ConfigurationParams, ConfigurationRequest, FetchError, LiveUpdateError, LiveUpdateResult,
    Timestamp,
};
pub use liveupdate_storage::{CacheStats, CacheStore, FileCacheStore, Lookup, MemoryCacheStore};

// ============================================================================
// MOCK FETCHER
// ============================================================================

/// Payload a scripted fetch answers with.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub configuration: Configuration,
    pub expires_at: Option<Timestamp>,
}

impl MockResponse {
    pub fn new(configuration: Configuration, expires_at: Option<Timestamp>) -> Self {
        Self {
            configuration,
            expires_at,
        }
    }
}

/// Fetcher that never touches the network.
///
/// Queued answers are consumed first, one per call; afterwards every call
/// gets the default answer. Every call is recorded.
#[derive(Debug)]
pub struct MockFetcher {
    queued: Mutex<VecDeque<Result<MockResponse, FetchError>>>,
    default: Result<MockResponse, FetchError>,
    calls: Mutex<Vec<(ConfigurationIdentity, ConfigurationRequest)>>,
}

impl MockFetcher {
    /// Always answer with `configuration`, expiring at `expires_at`.
    pub fn returning(configuration: Configuration, expires_at: Option<Timestamp>) -> Self {
        Self::with_default(Ok(MockResponse::new(configuration, expires_at)))
    }

    /// Always fail with `error`.
    pub fn failing(error: FetchError) -> Self {
        Self::with_default(Err(error))
    }

    fn with_default(default: Result<MockResponse, FetchError>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            default,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue one answer ahead of the default.
    pub fn push_response(&self, configuration: Configuration, expires_at: Option<Timestamp>) {
        lock(&self.queued).push_back(Ok(MockResponse::new(configuration, expires_at)));
    }

    /// Queue one failure ahead of the default.
    pub fn push_error(&self, error: FetchError) {
        lock(&self.queued).push_back(Err(error));
    }

    /// Number of fetches issued so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<ConfigurationRequest> {
        lock(&self.calls).iter().map(|(_, r)| r.clone()).collect()
    }

    /// Identities seen so far, in call order.
    pub fn identities(&self) -> Vec<ConfigurationIdentity> {
        lock(&self.calls).iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl ConfigurationFetcher for MockFetcher {
    async fn fetch(
        &self,
        id: &ConfigurationIdentity,
        request: &ConfigurationRequest,
    ) -> LiveUpdateResult<ConfigurationArtifact> {
        lock(&self.calls).push((id.clone(), request.clone()));
        let answer = lock(&self.queued)
            .pop_front()
            .unwrap_or_else(|| self.default.clone());

        match answer {
            Ok(response) => Ok(ConfigurationArtifact::new(
                id.clone(),
                response.configuration,
                response.expires_at,
            )),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// COUNTING STORE
// ============================================================================

/// Store wrapper that counts lookups and writes.
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    lookups: AtomicU64,
    puts: AtomicU64,
    fail_puts: AtomicBool,
}

impl<S: CacheStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lookups: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            fail_puts: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Attempted writes, including injected failures.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    /// Make every subsequent `put` fail without reaching the inner store.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for CountingStore<S> {
    async fn lookup_at(&self, id: &ConfigurationIdentity, now: Timestamp) -> Lookup {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup_at(id, now).await
    }

    async fn put(&self, artifact: &ConfigurationArtifact) -> LiveUpdateResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(CacheError::Io {
                path: artifact.id().to_string(),
                reason: "injected write failure".to_string(),
            }
            .into());
        }
        self.inner.put(artifact).await
    }

    async fn remove(&self, id: &ConfigurationIdentity) -> LiveUpdateResult<bool> {
        self.inner.remove(id).await
    }

    fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// `{features: {promo: true}, properties: {theme: "dark"}}`
pub fn sample_configuration() -> Configuration {
    configuration(&[("promo", true)], &[("theme", "dark")])
}

pub fn configuration(features: &[(&str, bool)], properties: &[(&str, &str)]) -> Configuration {
    Configuration::new(
        features
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
        properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

pub fn params(pairs: &[(&str, &str)]) -> ConfigurationParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// An expiration one hour from now.
pub fn future_expiry() -> Timestamp {
    Utc::now() + Duration::hours(1)
}

/// An expiration one hour ago.
pub fn past_expiry() -> Timestamp {
    Utc::now() - Duration::hours(1)
}

pub fn artifact_for(
    request: &ConfigurationRequest,
    configuration: Configuration,
    expires_at: Option<Timestamp>,
) -> ConfigurationArtifact {
    ConfigurationArtifact::new(
        ConfigurationIdentity::for_request(request),
        configuration,
        expires_at,
    )
}

/// Service response body carrying `configuration`.
pub fn response_body(configuration: &Configuration, expires_at: Option<&Timestamp>) -> Value {
    let mut body = json!({ "data": configuration.to_json() });
    if let Some(ts) = expires_at {
        body["expiresAt"] = Value::String(format_expires_at(ts));
    }
    body
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_consumes_queue_then_default() {
        let fetcher = MockFetcher::returning(sample_configuration(), Some(future_expiry()));
        fetcher.push_error(FetchError::Transport {
            url: "mock".to_string(),
            reason: "offline".to_string(),
        });
        let request = ConfigurationRequest::segment("18");
        let id = ConfigurationIdentity::for_request(&request);

        assert!(fetcher.fetch(&id, &request).await.is_err());
        let artifact = fetcher.fetch(&id, &request).await.expect("default answer");
        assert_eq!(artifact.property("theme"), Some("dark"));
        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(fetcher.identities(), vec![id.clone(), id]);
    }

    #[tokio::test]
    async fn test_counting_store_injected_failure() {
        let store = CountingStore::new(MemoryCacheStore::new());
        let artifact = artifact_for(
            &ConfigurationRequest::all(),
            sample_configuration(),
            Some(future_expiry()),
        );

        store.fail_puts(true);
        assert!(store.put(&artifact).await.is_err());
        assert!(store.get(artifact.id()).await.is_none());

        store.fail_puts(false);
        store.put(&artifact).await.expect("put");
        assert!(store.get(artifact.id()).await.is_some());
        assert_eq!(store.put_count(), 2);
        assert_eq!(store.lookup_count(), 2);
    }

    #[test]
    fn test_response_body_shape() {
        let body = response_body(&sample_configuration(), None);
        assert_eq!(body["data"]["features"]["promo"], true);
        assert!(body.get("expiresAt").is_none());
    }
}
