//! LiveUpdate Client - Remote Configuration Fetcher
//!
//! Turns a configuration request into one authenticated GET against the
//! LiveUpdate service and the response into a [`ConfigurationArtifact`].
//!
//! [`ConfigurationArtifact`]: liveupdate_core::ConfigurationArtifact

pub mod endpoint;
pub mod fetcher;
pub mod transport;

pub use endpoint::{ServiceEndpoint, SERVICE_PATH_PREFIX};
pub use fetcher::{ConfigurationFetcher, RemoteFetcher};
pub use transport::{HttpTransport, ResourceRequest, Transport, SCOPE_HEADER};
