//! Authorization request construction
//!
//! Pure construction of the browser redirect that starts the authorization
//! code flow. Nothing here performs network I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{OidcError, Result};

/// Endpoint path used when the caller does not name one.
pub const DEFAULT_ENDPOINT: &str = "authorize";

/// Default `response_type`.
pub const DEFAULT_RESPONSE_TYPE: &str = "code";

/// Optional parameters copied from caller input, in query order.
///
/// Any other caller-supplied key is dropped.
pub const OPTIONAL_PARAMS: &[&str] = &[
    "email",
    "password",
    "provider",
    "state",
    "response_mode",
    "nonce",
    "display",
    "prompt",
    "max_age",
    "ui_locales",
    "id_token_hint",
    "login_hint",
    "acr_values",
];

/// Caller overrides for an authorization request.
///
/// Unknown keys are accepted into `params` and filtered against
/// [`OPTIONAL_PARAMS`] when the request is built.
///
/// # Examples
///
/// ```
/// use oidcrp::oidc::authorization::AuthorizationOptions;
///
/// let options = AuthorizationOptions::default()
///     .param("state", "xyz")
///     .param("nonce", "n1");
/// assert_eq!(options.params["state"], "xyz");
///
/// let bare: AuthorizationOptions = "login".into();
/// assert_eq!(bare.endpoint.as_deref(), Some("login"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationOptions {
    /// Endpoint path on the authorization endpoint's origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Everything else the caller supplied
    #[serde(flatten)]
    pub params: BTreeMap<String, String>,
}

impl AuthorizationOptions {
    /// Adds a caller parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for AuthorizationOptions {
    fn from(endpoint: &str) -> Self {
        Self {
            endpoint: Some(endpoint.to_string()),
            ..Self::default()
        }
    }
}

/// Resolved query parameters of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationParams {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,

    /// Allow-listed optional parameters, in [`OPTIONAL_PARAMS`] order
    pub optional: Vec<(String, String)>,
}

impl AuthorizationParams {
    /// Resolves parameters from client defaults and caller overrides.
    ///
    /// `client_id` always comes from `config`.
    pub fn resolve(config: &ClientConfig, options: &AuthorizationOptions) -> Self {
        let optional = OPTIONAL_PARAMS
            .iter()
            .filter_map(|key| {
                options
                    .params
                    .get(*key)
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect();

        Self {
            response_type: options
                .response_type
                .clone()
                .unwrap_or_else(|| DEFAULT_RESPONSE_TYPE.to_string()),
            client_id: config.client_id.clone(),
            redirect_uri: options
                .redirect_uri
                .clone()
                .unwrap_or_else(|| config.redirect_uri.clone()),
            scope: options
                .scope
                .clone()
                .unwrap_or_else(|| config.resolved_scope()),
            optional,
        }
    }

    /// Query pairs: required fields first, then optional ones.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("response_type", self.response_type.as_str()),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", self.scope.as_str()),
        ]
        .into_iter()
        .chain(
            self.optional
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        )
    }
}

/// Builds the absolute authorization URL.
///
/// # Errors
///
/// Returns [`crate::OidcError::InvalidUrl`] when the authorization endpoint
/// cannot be parsed, and [`crate::OidcError::Configuration`] when it has no
/// origin to build on.
///
/// # Examples
///
/// ```
/// use oidcrp::config::ClientConfig;
/// use oidcrp::oidc::authorization::{authorization_uri, AuthorizationOptions};
///
/// let config = ClientConfig::new("https://idp.example", "c1", "s1")
///     .with_redirect_uri("https://app.example/cb");
/// let options = AuthorizationOptions::default().param("state", "xyz");
///
/// let uri = authorization_uri("https://idp.example/oauth/authorize", &config, &options).unwrap();
/// assert!(uri.starts_with("https://idp.example/authorize?response_type=code&client_id=c1"));
/// assert!(uri.ends_with("&state=xyz"));
/// ```
pub fn authorization_uri(
    authorization_endpoint: &str,
    config: &ClientConfig,
    options: &AuthorizationOptions,
) -> Result<String> {
    let endpoint = options.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
    let mut url = Url::parse(authorization_endpoint)?;
    if url.cannot_be_a_base() {
        return Err(OidcError::Configuration(format!(
            "authorization endpoint has no origin: {authorization_endpoint}"
        )));
    }
    url.set_path(&format!("/{}", endpoint.trim_start_matches('/')));
    url.set_query(None);
    url.set_fragment(None);

    let params = AuthorizationParams::resolve(config, options);
    url.query_pairs_mut().extend_pairs(params.pairs());

    Ok(url.to_string())
}
