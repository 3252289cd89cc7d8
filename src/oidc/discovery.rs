//! OpenID Connect provider discovery
//!
//! Fetches `<issuer>/.well-known/openid-configuration` and parses it into a
//! [`ProviderConfiguration`]. The document is replaced wholesale on every
//! fetch; nothing is merged.
//!
//! # References
//!
//! - OpenID Connect Discovery 1.0 <https://openid.net/specs/openid-connect-discovery-1_0.html>

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{OidcError, Result};

/// Path appended to the issuer to locate the discovery document.
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// Provider metadata discovered from the issuer.
///
/// Every endpoint is optional on the wire; operations that need one fail with
/// [`OidcError::Configuration`] when it is absent.
///
/// # Examples
///
/// ```
/// use oidcrp::oidc::discovery::ProviderConfiguration;
///
/// let json = r#"{
///     "issuer": "https://idp.example",
///     "token_endpoint": "https://idp.example/token",
///     "jwks_uri": "https://idp.example/jwks"
/// }"#;
///
/// let config: ProviderConfiguration = serde_json::from_str(json).unwrap();
/// assert_eq!(config.token_endpoint().unwrap(), "https://idp.example/token");
/// assert!(config.authorization_endpoint().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfiguration {
    /// Issuer identifier reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Browser redirect target for authorization requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    /// Authorization code exchange endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// OIDC UserInfo endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// Dynamic Client Registration endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,

    /// Location of the provider's JSON Web Key Set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// Additional metadata fields not explicitly modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProviderConfiguration {
    /// Builds the configuration from a discovery response body.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Configuration`] unless `body` is a JSON object.
    pub fn from_document(body: &str) -> Result<Self> {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value @ serde_json::Value::Object(_)) => {
                serde_json::from_value(value).map_err(|_| unable_to_retrieve())
            }
            _ => Err(unable_to_retrieve()),
        }
    }

    /// Returns the authorization endpoint.
    pub fn authorization_endpoint(&self) -> Result<&str> {
        required(&self.authorization_endpoint, "authorization_endpoint")
    }

    /// Returns the token endpoint.
    pub fn token_endpoint(&self) -> Result<&str> {
        required(&self.token_endpoint, "token_endpoint")
    }

    /// Returns the userinfo endpoint.
    pub fn userinfo_endpoint(&self) -> Result<&str> {
        required(&self.userinfo_endpoint, "userinfo_endpoint")
    }

    /// Returns the JWKS location.
    pub fn jwks_uri(&self) -> Result<&str> {
        required(&self.jwks_uri, "jwks_uri")
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| OidcError::Configuration(format!("provider configuration has no {name}")))
}

fn unable_to_retrieve() -> OidcError {
    OidcError::Configuration("unable to retrieve configuration".to_string())
}

/// Builds the discovery document URL for an issuer.
pub fn discovery_url(issuer: &str) -> String {
    format!("{}{}", issuer.trim_end_matches('/'), WELL_KNOWN_PATH)
}

/// Fetches the provider configuration for `issuer`.
///
/// No retry is attempted.
///
/// # Arguments
///
/// * `http` - Shared [`reqwest::Client`] used to issue the discovery request.
/// * `issuer` - The configured issuer base URL.
///
/// # Errors
///
/// Returns [`OidcError::Http`] on transport failure, unchanged, and
/// [`OidcError::Configuration`] when the response is not a JSON object.
///
/// # Examples
///
/// ```no_run
/// use oidcrp::oidc::discovery::fetch_provider_configuration;
///
/// # async fn example() -> oidcrp::Result<()> {
/// let http = reqwest::Client::new();
/// let config = fetch_provider_configuration(&http, "https://idp.example").await?;
/// println!("token endpoint: {}", config.token_endpoint()?);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_provider_configuration(
    http: &reqwest::Client,
    issuer: &str,
) -> Result<ProviderConfiguration> {
    let url = discovery_url(issuer);
    tracing::debug!(url = %url, "Fetching provider configuration");

    let resp = http.get(&url).send().await?;

    if !resp.status().is_success() {
        tracing::warn!(url = %url, status = %resp.status(), "Discovery request was not successful");
        return Err(unable_to_retrieve());
    }

    let body = resp.text().await?;
    ProviderConfiguration::from_document(&body)
}
