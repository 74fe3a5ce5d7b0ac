//! On-disk addressing for cache records.
//!
//! Identities are arbitrary text (`_lat_35.13E`, `vip%2Fusers`, even `..`),
//! so they are never used as path components directly. A record lives in a
//! directory named by the hex SHA-256 of its identity, which is fixed-length,
//! filesystem-safe, and cannot escape the cache root.

use std::path::{Path, PathBuf};

use liveupdate_core::ConfigurationIdentity;
use sha2::{Digest, Sha256};

/// File holding the serialized configuration payload.
pub const PAYLOAD_FILE: &str = "configuration.json";
/// File holding `{"expiresAt": ...}`.
pub const METADATA_FILE: &str = "metadata.json";

/// Directory name of one identity's record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    name: String,
}

impl RecordKey {
    pub fn new(id: &ConfigurationIdentity) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(id.as_str().as_bytes());
        Self {
            name: hex::encode(hasher.finalize()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(&self.name)
    }

    pub fn payload_path(&self, root: &Path) -> PathBuf {
        self.dir(root).join(PAYLOAD_FILE)
    }

    pub fn metadata_path(&self, root: &Path) -> PathBuf {
        self.dir(root).join(METADATA_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_key_is_hex_sha256() {
        let key = RecordKey::new(&ConfigurationIdentity::from_raw("18"));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_traversal_identity_stays_under_root() {
        let root = Path::new("/cache");
        let key = RecordKey::new(&ConfigurationIdentity::from_raw("../../etc"));
        let dir = key.dir(root);
        assert_eq!(dir.parent(), Some(root));
        assert_eq!(
            key.metadata_path(root).file_name().and_then(|n| n.to_str()),
            Some(METADATA_FILE)
        );
    }

    proptest! {
        /// Property: distinct identities map to distinct directories.
        #[test]
        fn prop_distinct_identities_distinct_keys(a in ".{0,24}", b in ".{0,24}") {
            let ka = RecordKey::new(&ConfigurationIdentity::from_raw(a.clone()));
            let kb = RecordKey::new(&ConfigurationIdentity::from_raw(b.clone()));
            if a == b {
                prop_assert_eq!(ka, kb);
            } else {
                prop_assert_ne!(ka, kb);
            }
        }

        /// Property: every key is a single path component under the root.
        #[test]
        fn prop_key_is_single_component(raw in ".{0,32}") {
            let root = Path::new("/cache");
            let key = RecordKey::new(&ConfigurationIdentity::from_raw(raw));
            let dir = key.dir(root);
            prop_assert_eq!(dir.parent(), Some(root));
        }
    }
}
