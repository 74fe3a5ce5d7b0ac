//! Configuration payloads and the artifacts that carry them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::MalformedResponseError;
use crate::expiry::{self, Timestamp};
use crate::identity::ConfigurationIdentity;

/// Key of the configuration object inside a service response.
pub const DATA_KEY: &str = "data";
/// Key of the expiration date inside a service response.
pub const EXPIRES_AT_KEY: &str = "expiresAt";
pub const FEATURES_KEY: &str = "features";
pub const PROPERTIES_KEY: &str = "properties";

/// Feature flags and properties resolved for one identity.
///
/// Lookups for unknown names return `None`; they never fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new(features: BTreeMap<String, bool>, properties: BTreeMap<String, String>) -> Self {
        Self {
            features,
            properties,
        }
    }

    /// Empty configuration, the fail-soft result of a malformed response.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Enablement of a feature, or `None` if the feature is unknown.
    pub fn is_feature_enabled(&self, feature_id: &str) -> Option<bool> {
        self.features.get(feature_id).copied()
    }

    /// Value of a property, or `None` if the property is unknown.
    pub fn property(&self, property_id: &str) -> Option<&str> {
        self.properties.get(property_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.properties.is_empty()
    }

    /// Build a configuration from the service's `data` object.
    ///
    /// Missing sections become empty maps. Features keep only boolean
    /// values; properties keep strings verbatim and render numbers and
    /// booleans as their JSON text. Other values are dropped.
    pub fn from_data(data: &Value) -> Result<Self, MalformedResponseError> {
        let object = data
            .as_object()
            .ok_or_else(|| MalformedResponseError::InvalidData {
                reason: format!("expected object, got {}", json_kind(data)),
            })?;

        let features = section(object, FEATURES_KEY)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(name, value)| value.as_bool().map(|b| (name.clone(), b)))
                    .collect()
            })
            .unwrap_or_default();

        let properties = section(object, PROPERTIES_KEY)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(name, value)| property_text(value).map(|v| (name.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            features,
            properties,
        })
    }

    /// The payload as JSON, as handed back to callers.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            FEATURES_KEY: self.features,
            PROPERTIES_KEY: self.properties,
        })
    }
}

fn section<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    object.get(key).and_then(Value::as_object)
}

fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One resolved configuration bundle for an identity.
///
/// Immutable once built; a refresh produces a new artifact that replaces the
/// stored one. `expires_at` is only consulted by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationArtifact {
    id: ConfigurationIdentity,
    configuration: Configuration,
    expires_at: Option<Timestamp>,
}

impl ConfigurationArtifact {
    pub fn new(
        id: ConfigurationIdentity,
        configuration: Configuration,
        expires_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            configuration,
            expires_at,
        }
    }

    /// Build an artifact from a service response body.
    ///
    /// Never fails: an absent body, a non-object body, or a malformed `data`
    /// object yields an empty configuration, and the anomaly is returned
    /// alongside so the caller can log it. A missing or unparseable
    /// `expiresAt` leaves the artifact already expired.
    pub fn from_response(
        id: ConfigurationIdentity,
        body: Option<&Value>,
    ) -> (Self, Option<MalformedResponseError>) {
        let Some(object) = body.and_then(Value::as_object) else {
            return (
                Self::new(id, Configuration::empty(), None),
                Some(MalformedResponseError::MissingBody),
            );
        };

        let expires_at = object
            .get(EXPIRES_AT_KEY)
            .and_then(Value::as_str)
            .and_then(expiry::parse_expires_at);

        let (configuration, anomaly) = match object.get(DATA_KEY) {
            Some(data) => match Configuration::from_data(data) {
                Ok(configuration) => (configuration, None),
                Err(e) => (Configuration::empty(), Some(e)),
            },
            None => (
                Configuration::empty(),
                Some(MalformedResponseError::InvalidData {
                    reason: format!("missing '{}' field", DATA_KEY),
                }),
            ),
        };

        (Self::new(id, configuration, expires_at), anomaly)
    }

    pub fn id(&self) -> &ConfigurationIdentity {
        &self.id
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn into_configuration(self) -> Configuration {
        self.configuration
    }

    pub fn expires_at(&self) -> Option<&Timestamp> {
        self.expires_at.as_ref()
    }

    /// Returns true if the artifact must not be served from cache at `now`.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        expiry::is_expired(self.expires_at.as_ref(), now)
    }

    pub fn is_feature_enabled(&self, feature_id: &str) -> Option<bool> {
        self.configuration.is_feature_enabled(feature_id)
    }

    pub fn property(&self, property_id: &str) -> Option<&str> {
        self.configuration.property(property_id)
    }
}
