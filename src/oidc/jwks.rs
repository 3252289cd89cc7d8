//! JSON Web Key Set retrieval
//!
//! Fetches the provider's signing keys from `jwks_uri` and indexes them by
//! their declared `use`. A [`KeySet`] is always rebuilt from a complete
//! document and swapped in whole; it is never merged incrementally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OidcError, Result};

/// Signing keys of a provider.
///
/// `keys` keeps the raw keys in document order. `by_use` maps each declared
/// `use` value to the last key carrying it. Serialized, the set is the JWKS
/// document augmented with one top-level entry per use:
///
/// ```
/// use oidcrp::oidc::jwks::KeySet;
/// use serde_json::json;
///
/// let set = KeySet::from_document(json!({
///     "keys": [{"kid": "a", "use": "sig"}, {"kid": "b", "use": "enc"}]
/// }))
/// .unwrap();
///
/// assert_eq!(set.by_use("sig").unwrap()["kid"], "a");
/// assert_eq!(serde_json::to_value(&set).unwrap()["enc"]["kid"], "b");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeySet {
    /// Raw keys in document order.
    pub keys: Vec<Value>,

    /// Keys indexed by declared use, last key wins.
    #[serde(flatten)]
    pub by_use: BTreeMap<String, Value>,
}

impl KeySet {
    /// Builds a key set from a JWKS document.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Configuration`] unless the document is an object
    /// with a `keys` array.
    pub fn from_document(document: Value) -> Result<Self> {
        let keys = match document {
            Value::Object(mut map) => match map.remove("keys") {
                Some(Value::Array(keys)) => keys,
                _ => return Err(unable_to_retrieve()),
            },
            _ => return Err(unable_to_retrieve()),
        };

        let mut by_use = BTreeMap::new();
        for key in &keys {
            if let Some(key_use) = key.get("use").and_then(Value::as_str) {
                // "keys" would collide with the raw list when serialized
                if key_use != "keys" {
                    by_use.insert(key_use.to_string(), key.clone());
                }
            }
        }

        Ok(Self { keys, by_use })
    }

    /// First key in document order, the canonical signing key.
    pub fn first(&self) -> Option<&Value> {
        self.keys.first()
    }

    /// Key declared for `key_use`, e.g. `"sig"`.
    pub fn by_use(&self, key_use: &str) -> Option<&Value> {
        self.by_use.get(key_use)
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` when the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn unable_to_retrieve() -> OidcError {
    OidcError::Configuration("unable to retrieve signing keys".to_string())
}

/// Fetches and indexes the key set published at `jwks_uri`.
///
/// # Errors
///
/// Returns [`OidcError::Http`] on transport failure or a non-JSON body, and
/// [`OidcError::Configuration`] when the body is not a JWKS document.
pub async fn fetch_key_set(http: &reqwest::Client, jwks_uri: &str) -> Result<KeySet> {
    tracing::debug!(jwks_uri = %jwks_uri, "Fetching signing keys");

    let resp = http.get(jwks_uri).send().await?;
    if !resp.status().is_success() {
        tracing::warn!(jwks_uri = %jwks_uri, status = %resp.status(), "JWKS request was not successful");
        return Err(unable_to_retrieve());
    }

    let document: Value = resp.json().await?;
    KeySet::from_document(document)
}
