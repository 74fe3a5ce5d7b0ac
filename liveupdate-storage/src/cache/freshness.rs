//! Cache policy for a resolve call and the outcome of a cache lookup.

use liveupdate_core::{ConfigurationArtifact, Timestamp};

/// Whether a resolve call may be answered from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Serve a live cached artifact if one exists.
    #[default]
    UseCache,
    /// Always go to the network. The fetched artifact is still stored.
    Bypass,
}

impl CachePolicy {
    pub fn allows_cache(&self) -> bool {
        matches!(self, Self::UseCache)
    }
}

impl From<bool> for CachePolicy {
    fn from(use_cache: bool) -> Self {
        if use_cache {
            Self::UseCache
        } else {
            Self::Bypass
        }
    }
}

/// What a cache lookup found for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A live artifact.
    Hit(ConfigurationArtifact),
    /// No record.
    Miss,
    /// A record whose expiration is at or before the lookup time.
    Expired { expires_at: Timestamp },
    /// A record that could not be read or parsed, including a payload
    /// without usable metadata.
    Invalid { reason: String },
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// The artifact for a hit; `None` for every other outcome.
    pub fn into_artifact(self) -> Option<ConfigurationArtifact> {
        match self {
            Self::Hit(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hit(_) => "hit",
            Self::Miss => "miss",
            Self::Expired { .. } => "expired",
            Self::Invalid { .. } => "invalid",
        }
    }
}
