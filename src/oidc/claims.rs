//! Token claims
//!
//! Claims are produced either by decoding a structured token's payload or by
//! the provider's introspection response. Both paths deserialize into the same
//! [`Claims`] shape so that one rule set validates them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Audience claim, a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Returns `true` when any audience value is in `accepted`.
    pub fn is_any_of(&self, accepted: &[String]) -> bool {
        match self {
            Audience::Single(aud) => accepted.contains(aud),
            Audience::Multiple(auds) => auds.iter().any(|aud| accepted.contains(aud)),
        }
    }
}

impl From<&str> for Audience {
    fn from(s: &str) -> Self {
        Audience::Single(s.to_string())
    }
}

/// Claims carried by, or resolved for, a token.
///
/// Only the claims the verifier inspects are modelled; everything else the
/// provider returns is kept in `extra`.
///
/// # Examples
///
/// ```
/// use oidcrp::oidc::claims::Claims;
///
/// let claims: Claims = serde_json::from_str(
///     r#"{"iss": "https://idp.example", "exp": 1900000000, "scope": "openid api:read"}"#,
/// ).unwrap();
///
/// assert!(claims.has_scope("api:read"));
/// assert!(!claims.has_scope("api:write"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Token identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiry, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<f64>,

    /// Issued at, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<f64>,

    /// Space-delimited granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Any other claim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Iterates the granted scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or_default().split_whitespace()
    }

    /// Returns `true` when every space-delimited entry of `required` is granted.
    pub fn has_scope(&self, required: &str) -> bool {
        required
            .split_whitespace()
            .all(|needed| self.scopes().any(|granted| granted == needed))
    }
}
