//! Configuration management for oidcrp
//!
//! This module handles loading, parsing, validating, and managing the
//! construction-time client configuration from YAML files and environment
//! variables.

use crate::error::{OidcError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Scopes every authorization request asks for, ahead of any configured scope.
pub const DEFAULT_SCOPES: [&str; 2] = ["openid", "profile"];

/// Relying-party client configuration
///
/// Holds the issuer, client credentials, default redirect URI and scope, plus
/// the transport options used to build the shared HTTP client.
///
/// # Examples
///
/// ```
/// use oidcrp::config::ClientConfig;
///
/// let config = ClientConfig::new("https://idp.example", "c1", "s1")
///     .with_redirect_uri("https://app.example/callback")
///     .with_scope("email");
///
/// assert_eq!(config.resolved_scope(), "openid profile email");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Issuer base URL of the provider
    pub issuer: String,

    /// Client identifier registered with the provider
    pub client_id: String,

    /// Client secret used for HTTP Basic authentication
    #[serde(default)]
    pub client_secret: String,

    /// Default redirect URI sent with authorization and token requests
    #[serde(default)]
    pub redirect_uri: String,

    /// Additional scope(s), always appended to `openid profile`
    #[serde(default)]
    pub scope: ScopeSpec,

    /// Transport options
    #[serde(default)]
    pub http: HttpConfig,
}

/// Scope configuration accepted either as a single string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeSpec {
    /// Space-delimited scope string
    Single(String),
    /// List of individual scopes
    List(Vec<String>),
}

impl Default for ScopeSpec {
    fn default() -> Self {
        ScopeSpec::List(Vec::new())
    }
}

impl ScopeSpec {
    fn parts(&self) -> Vec<&str> {
        match self {
            ScopeSpec::Single(s) if s.trim().is_empty() => Vec::new(),
            ScopeSpec::Single(s) => vec![s.trim()],
            ScopeSpec::List(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Connection establishment timeout (seconds)
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("oidcrp/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    /// Builds the shared HTTP client from these options.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Http`] if the TLS backend cannot be initialised.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .connect_timeout(Duration::from_secs(self.connect_timeout_seconds))
            .user_agent(self.user_agent.clone())
            .build()?;
        Ok(client)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scope: ScopeSpec::default(),
            http: HttpConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with the given issuer and client credentials.
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    /// Sets the default redirect URI.
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Sets the additional scope(s).
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = ScopeSpec::Single(scope.into());
        self
    }

    /// Sets the additional scopes from a list.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = ScopeSpec::List(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Load configuration from file and environment
    ///
    /// A missing file is not an error; defaults are used and the environment
    /// overrides applied on top.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(issuer) = std::env::var("OIDCRP_ISSUER") {
            tracing::debug!(issuer = %issuer, "Env override: OIDCRP_ISSUER");
            self.issuer = issuer;
        }

        if let Ok(client_id) = std::env::var("OIDCRP_CLIENT_ID") {
            tracing::debug!(client_id = %client_id, "Env override: OIDCRP_CLIENT_ID");
            self.client_id = client_id;
        }

        if let Ok(client_secret) = std::env::var("OIDCRP_CLIENT_SECRET") {
            tracing::debug!("Env override: OIDCRP_CLIENT_SECRET");
            self.client_secret = client_secret;
        }

        if let Ok(redirect_uri) = std::env::var("OIDCRP_REDIRECT_URI") {
            tracing::debug!(redirect_uri = %redirect_uri, "Env override: OIDCRP_REDIRECT_URI");
            self.redirect_uri = redirect_uri;
        }

        if let Ok(scope) = std::env::var("OIDCRP_SCOPE") {
            tracing::debug!(scope = %scope, "Env override: OIDCRP_SCOPE");
            self.scope = ScopeSpec::Single(scope);
        }

        if let Ok(timeout) = std::env::var("OIDCRP_HTTP_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(v) => {
                    self.http.timeout_seconds = v;
                    tracing::debug!(timeout_seconds = v, "Env override: OIDCRP_HTTP_TIMEOUT_SECONDS");
                }
                Err(_) => {
                    tracing::warn!("Invalid value for OIDCRP_HTTP_TIMEOUT_SECONDS: {}", timeout);
                }
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Configuration`] if the issuer is missing or not a
    /// URL, the client id is empty, the redirect URI is set but not a URL, or
    /// the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.issuer.is_empty() {
            return Err(OidcError::Configuration("issuer cannot be empty".to_string()));
        }

        Url::parse(&self.issuer).map_err(|e| {
            OidcError::Configuration(format!("issuer is not a valid URL: {}", e))
        })?;

        if self.client_id.is_empty() {
            return Err(OidcError::Configuration("client_id cannot be empty".to_string()));
        }

        if !self.redirect_uri.is_empty() {
            Url::parse(&self.redirect_uri).map_err(|e| {
                OidcError::Configuration(format!("redirect_uri is not a valid URL: {}", e))
            })?;
        }

        if self.http.timeout_seconds == 0 {
            return Err(OidcError::Configuration(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns `openid profile` followed by the configured scope(s).
    ///
    /// Repeats are kept; the provider tolerates them.
    pub fn resolved_scope(&self) -> String {
        DEFAULT_SCOPES
            .iter()
            .copied()
            .chain(self.scope.parts())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Issuer with any trailing slash removed, for building provider URLs.
    pub fn issuer_base(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }
}
