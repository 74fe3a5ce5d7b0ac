//! LiveUpdate Engine - Configuration Resolution
//!
//! Entry point for hosts: a [`Resolver`] answers configuration requests from
//! the persistent cache or the remote service, and [`ResolveOptions`] /
//! [`FailureReport`] carry the JSON surface hosts talk through.

pub mod options;
pub mod resolver;
pub mod telemetry;

pub use options::{FailureReport, ResolveOptions};
pub use resolver::{DefaultResolver, Resolver};
pub use telemetry::{init_tracing, LogFormat, DEFAULT_FILTER, LOG_ENV_VAR};

// Re-export the types callers need alongside the resolver.
pub use liveupdate_client::{ConfigurationFetcher, HttpTransport, RemoteFetcher, ServiceEndpoint};
pub use liveupdate_core::{
    Configuration, ConfigurationArtifact, ConfigurationIdentity, ConfigurationParams,
    ConfigurationRequest, LiveUpdateConfig, LiveUpdateError, LiveUpdateResult, PersistMode,
};
pub use liveupdate_storage::{CachePolicy, CacheStore, FileCacheStore, MemoryCacheStore};
