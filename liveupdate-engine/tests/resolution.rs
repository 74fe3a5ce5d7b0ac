//! Resolution against the on-disk store with a scripted fetcher.

use std::sync::Arc;
use std::time::Duration;

use liveupdate_engine::{
    CachePolicy, ConfigurationIdentity, ConfigurationRequest, FileCacheStore, PersistMode,
    ResolveOptions, Resolver,
};
use liveupdate_test_utils::{
    future_expiry, params, past_expiry, sample_configuration, CacheStore, CountingStore,
    FetchError, MockFetcher,
};
use tempfile::TempDir;

type FileResolver = Resolver<CountingStore<FileCacheStore>, MockFetcher>;

fn create_resolver(dir: &TempDir, fetcher: MockFetcher, mode: PersistMode) -> FileResolver {
    let store = CountingStore::new(FileCacheStore::new(dir.path().join("liveupdate")));
    Resolver::new(Arc::new(store), Arc::new(fetcher)).with_persist_mode(mode)
}

fn default_fetcher() -> MockFetcher {
    MockFetcher::returning(sample_configuration(), Some(future_expiry()))
}

#[tokio::test]
async fn test_segment_is_served_from_cache_on_second_call() {
    let dir = TempDir::new().expect("tempdir");
    let resolver = create_resolver(&dir, default_fetcher(), PersistMode::Inline);

    let options = ResolveOptions::from_json_str(r#"{"segmentId": "18", "useClientCache": true}"#)
        .expect("options");

    let first = resolver.resolve_options(&options).await.expect("fetched");
    assert_eq!(first.is_feature_enabled("promo"), Some(true));
    assert_eq!(first.property("theme"), Some("dark"));
    assert_eq!(resolver.fetcher().call_count(), 1);

    let second = resolver.resolve_options(&options).await.expect("cached");
    assert_eq!(second, first);
    assert_eq!(resolver.fetcher().call_count(), 1);

    let record_dir = resolver
        .store()
        .inner()
        .record_dir(&ConfigurationIdentity::from_segment("18"));
    assert!(record_dir.join("configuration.json").is_file());
    assert!(record_dir.join("metadata.json").is_file());
}

#[tokio::test]
async fn test_default_resolver_serves_second_call_from_cache() {
    let dir = TempDir::new().expect("tempdir");
    let store = CountingStore::new(FileCacheStore::new(dir.path().join("liveupdate")));
    let resolver = Resolver::new(Arc::new(store), Arc::new(default_fetcher()));

    resolver.resolve_segment("18", true).await.expect("fetched");
    resolver.resolve_segment("18", true).await.expect("cached");

    assert_eq!(resolver.fetcher().call_count(), 1);
    assert_eq!(
        resolver.fetcher().identities(),
        vec![ConfigurationIdentity::from_segment("18")]
    );
}

#[tokio::test]
async fn test_params_without_cache_always_fetch() {
    let dir = TempDir::new().expect("tempdir");
    let resolver = create_resolver(&dir, default_fetcher(), PersistMode::Inline);
    let options = ResolveOptions::from_json_str(
        r#"{"params": {"lat": "35.13E", "lon": "32.78N"}, "useClientCache": false}"#,
    )
    .expect("options");

    resolver.resolve_options(&options).await.expect("first");
    resolver.resolve_options(&options).await.expect("second");

    assert_eq!(resolver.fetcher().call_count(), 2);
    assert_eq!(resolver.store().put_count(), 2);

    let id = ConfigurationIdentity::for_request(&options.request());
    assert_eq!(id.as_str(), "_lat_35.13E_lon_32.78N");
    assert!(resolver.store().get(&id).await.is_some());
}

#[tokio::test]
async fn test_cached_artifact_survives_new_resolver() {
    let dir = TempDir::new().expect("tempdir");
    let request = ConfigurationRequest::params(params(&[("country", "IL")]));

    let resolver = create_resolver(&dir, default_fetcher(), PersistMode::Inline);
    resolver.resolve(&request, true).await.expect("fetched");

    let fetcher = MockFetcher::failing(FetchError::Transport {
        url: "mock".to_string(),
        reason: "offline".to_string(),
    });
    let restarted = create_resolver(&dir, fetcher, PersistMode::Inline);
    let artifact = restarted.resolve(&request, true).await.expect("from disk");

    assert_eq!(artifact.configuration(), &sample_configuration());
    assert_eq!(restarted.fetcher().call_count(), 0);
}

#[tokio::test]
async fn test_expired_record_on_disk_is_refetched() {
    let dir = TempDir::new().expect("tempdir");
    let fetcher = default_fetcher();
    fetcher.push_response(sample_configuration(), Some(past_expiry()));
    let resolver = create_resolver(&dir, fetcher, PersistMode::Inline);

    resolver.resolve_all(true).await.expect("first");
    resolver.resolve_all(true).await.expect("refetch");
    resolver.resolve_all(true).await.expect("cached");

    assert_eq!(resolver.fetcher().call_count(), 2);
}

#[tokio::test]
async fn test_missing_expiry_is_never_served_from_cache() {
    let dir = TempDir::new().expect("tempdir");
    let resolver = create_resolver(
        &dir,
        MockFetcher::returning(sample_configuration(), None),
        PersistMode::Inline,
    );

    resolver.resolve_segment("vip", true).await.expect("first");
    resolver.resolve_segment("vip", true).await.expect("second");

    assert_eq!(resolver.fetcher().call_count(), 2);
}

#[tokio::test]
async fn test_fetch_failure_leaves_no_record() {
    let dir = TempDir::new().expect("tempdir");
    let resolver = create_resolver(
        &dir,
        MockFetcher::failing(FetchError::Status {
            url: "mock".to_string(),
            status: 500,
            message: "Internal Server Error".to_string(),
        }),
        PersistMode::Inline,
    );

    let err = resolver
        .resolve_segment("18", CachePolicy::UseCache)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"));
    assert_eq!(resolver.store().put_count(), 0);
    assert!(!resolver
        .store()
        .inner()
        .record_dir(&ConfigurationIdentity::from_segment("18"))
        .exists());
}

#[tokio::test]
async fn test_detached_persist_lands_eventually() {
    let dir = TempDir::new().expect("tempdir");
    let resolver = create_resolver(&dir, default_fetcher(), PersistMode::Detached);
    let request = ConfigurationRequest::segment("18");
    let id = ConfigurationIdentity::for_request(&request);

    let artifact = resolver.resolve(&request, true).await.expect("fetched");
    assert_eq!(artifact.property("theme"), Some("dark"));

    let mut stored = false;
    for _ in 0..100 {
        if resolver.store().inner().get(&id).await.is_some() {
            stored = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(stored, "detached write never reached the store");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolves_all_succeed() {
    let dir = TempDir::new().expect("tempdir");
    let resolver = create_resolver(&dir, default_fetcher(), PersistMode::Inline);

    let mut handles = Vec::new();
    for i in 0..16 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            let segment = format!("seg{}", i % 4);
            resolver.resolve_segment(&segment, true).await
        }));
    }
    for handle in handles {
        let artifact = handle.await.expect("join").expect("resolve");
        assert_eq!(artifact.configuration(), &sample_configuration());
    }

    // Every segment was fetched at least once and at most once per caller.
    let calls = resolver.fetcher().call_count();
    assert!((4..=16).contains(&calls));
}
