//! Relying-party client façade
//!
//! [`Client`] holds the configuration, the shared HTTP client and the cached
//! provider state, and composes discovery, key retrieval, authorization URL
//! construction, code exchange and standalone verification.
//!
//! Cached state is replaced, never merged: each fetch builds the complete
//! value before swapping it in under a short write lock, so concurrent
//! readers see either the previous value or the new one.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::{OidcError, Result, UnauthorizedError};
use crate::oidc::authorization::{self, AuthorizationOptions, AuthorizationParams};
use crate::oidc::claims::Claims;
use crate::oidc::discovery::{fetch_provider_configuration, ProviderConfiguration};
use crate::oidc::exchange::{TokenExchange, TokenRequest, TokenSet};
use crate::oidc::jwks::{fetch_key_set, KeySet};
use crate::oidc::signature::{
    IdTokenVerifier, JwkSignatureVerifier, JwtIdTokenVerifier, SignatureVerifier,
};
use crate::oidc::verifier::{TokenVerifier, VerificationOptions};

/// Per-call overrides for [`Client::verify`].
///
/// Every unset field falls back to the client: issuer, credentials and scope
/// from its configuration, the signing key from its cached key set.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    /// Acceptable audiences; the audience check is skipped when unset
    pub audiences: Option<Vec<String>>,

    /// Required scope; defaults to the client's resolved scope
    pub scope: Option<String>,

    /// Explicit signing key, taking precedence over `key_use`
    pub key: Option<Value>,

    /// Select the cached key declared for this use, e.g. `"sig"`
    pub key_use: Option<String>,
}

/// OpenID Connect relying-party client.
///
/// # Examples
///
/// ```no_run
/// use oidcrp::{Client, ClientConfig};
/// use oidcrp::oidc::exchange::TokenRequest;
///
/// # async fn example() -> oidcrp::Result<()> {
/// let config = ClientConfig::new("https://idp.example", "c1", "s1")
///     .with_redirect_uri("https://app.example/cb");
/// let client = Client::new(config)?;
///
/// client.discover().await?;
/// client.get_jwks().await?;
///
/// let tokens = client.token(&TokenRequest::with_code("abc")).await?;
/// println!("{:?}", tokens.access_claims);
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: ClientConfig,
    http: Arc<reqwest::Client>,
    provider: RwLock<Option<Arc<ProviderConfiguration>>>,
    keys: RwLock<Option<Arc<KeySet>>>,
    verifier: Arc<TokenVerifier>,
    exchange: TokenExchange,
}

impl Client {
    /// Creates a client with an HTTP client built from `config.http`.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Configuration`] if the configuration is invalid.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = config.http.build_client()?;
        Ok(Self::with_http_client(config, http))
    }

    /// Creates a client around an existing HTTP client.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        Self::with_verifiers(
            config,
            http,
            Arc::new(JwkSignatureVerifier),
            Arc::new(JwtIdTokenVerifier),
        )
    }

    /// Creates a client with custom verification capabilities.
    pub fn with_verifiers(
        config: ClientConfig,
        http: reqwest::Client,
        signature: Arc<dyn SignatureVerifier>,
        id_tokens: Arc<dyn IdTokenVerifier>,
    ) -> Self {
        let http = Arc::new(http);
        let verifier = Arc::new(TokenVerifier::new(Arc::clone(&http), signature));
        let exchange = TokenExchange::new(Arc::clone(&http), id_tokens, Arc::clone(&verifier));

        Self {
            config,
            http,
            provider: RwLock::new(None),
            keys: RwLock::new(None),
            verifier,
            exchange,
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Provider state
    // -----------------------------------------------------------------------

    /// Fetches the provider configuration and replaces the cached one.
    pub async fn discover(&self) -> Result<Arc<ProviderConfiguration>> {
        let provider =
            Arc::new(fetch_provider_configuration(&self.http, self.config.issuer_base()).await?);
        *self.provider.write().await = Some(Arc::clone(&provider));
        tracing::info!(issuer = %self.config.issuer, "Provider configuration discovered");
        Ok(provider)
    }

    /// The cached provider configuration, if discovered.
    pub async fn provider_configuration(&self) -> Option<Arc<ProviderConfiguration>> {
        self.provider.read().await.clone()
    }

    async fn require_provider(&self) -> Result<Arc<ProviderConfiguration>> {
        self.provider_configuration().await.ok_or_else(|| {
            OidcError::Configuration("provider configuration has not been discovered".to_string())
        })
    }

    /// Fetches the signing keys and replaces the cached key set.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Configuration`] before any request when the
    /// provider has not been discovered or publishes no `jwks_uri`.
    pub async fn get_jwks(&self) -> Result<Arc<KeySet>> {
        let provider = self.require_provider().await?;
        let keys = Arc::new(fetch_key_set(&self.http, provider.jwks_uri()?).await?);
        *self.keys.write().await = Some(Arc::clone(&keys));
        tracing::info!(keys = keys.len(), "Signing keys refreshed");
        Ok(keys)
    }

    /// The cached key set, if fetched.
    pub async fn key_set(&self) -> Option<Arc<KeySet>> {
        self.keys.read().await.clone()
    }

    async fn require_keys(&self) -> Result<Arc<KeySet>> {
        self.key_set().await.ok_or_else(|| {
            OidcError::Configuration("signing keys have not been retrieved".to_string())
        })
    }

    // -----------------------------------------------------------------------
    // Authorization
    // -----------------------------------------------------------------------

    /// Resolves the authorization request parameters.
    pub fn authorization_params(&self, options: &AuthorizationOptions) -> AuthorizationParams {
        AuthorizationParams::resolve(&self.config, options)
    }

    /// Builds the authorization redirect URL. No request is made.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Configuration`] when the provider has not been
    /// discovered or has no authorization endpoint.
    pub async fn authorization_uri(&self, options: &AuthorizationOptions) -> Result<String> {
        let provider = self.require_provider().await?;
        authorization::authorization_uri(provider.authorization_endpoint()?, &self.config, options)
    }

    // -----------------------------------------------------------------------
    // Tokens
    // -----------------------------------------------------------------------

    /// Exchanges an authorization code and verifies the returned tokens.
    ///
    /// A missing code fails before any state is consulted.
    pub async fn token(&self, request: &TokenRequest) -> Result<TokenSet> {
        request.authorization_code()?;
        let provider = self.require_provider().await?;
        let keys = self.require_keys().await?;
        self.exchange
            .exchange(&self.config, &provider, &keys, request)
            .await
    }

    /// Verifies a bearer token presented to a protected resource.
    ///
    /// Structured tokens need a signing key: `options.key`, else the cached
    /// key declared for `options.key_use`, else the first cached key.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::MissingToken`] for an empty token, and otherwise
    /// whatever [`TokenVerifier::verify`] returns.
    pub async fn verify(&self, token: &str, options: &VerifyOptions) -> Result<Claims> {
        if token.is_empty() {
            return Err(OidcError::MissingToken);
        }

        let signing_key = match &options.key {
            Some(key) => Some(key.clone()),
            None => self.key_set().await.and_then(|keys| {
                options
                    .key_use
                    .as_deref()
                    .map_or_else(|| keys.first(), |key_use| keys.by_use(key_use))
                    .cloned()
            }),
        };

        let verification = VerificationOptions {
            issuer: options
                .issuer
                .clone()
                .unwrap_or_else(|| self.config.issuer.clone()),
            client_id: options
                .client_id
                .clone()
                .unwrap_or_else(|| self.config.client_id.clone()),
            client_secret: options
                .client_secret
                .clone()
                .unwrap_or_else(|| self.config.client_secret.clone()),
            audiences: options.audiences.clone(),
            scope: Some(
                options
                    .scope
                    .clone()
                    .unwrap_or_else(|| self.config.resolved_scope()),
            ),
            signing_key,
        };

        self.verifier.verify(token, &verification).await
    }

    /// Fetches the UserInfo claims for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::MissingToken`] for an empty token before any other
    /// check, [`OidcError::Configuration`] without a discovered userinfo
    /// endpoint, and [`OidcError::Unauthorized`] when the provider refuses the
    /// token.
    pub async fn user_info(&self, access_token: &str) -> Result<Value> {
        if access_token.is_empty() {
            return Err(OidcError::MissingToken);
        }
        let provider = self.require_provider().await?;
        let endpoint = provider.userinfo_endpoint()?;

        tracing::debug!(endpoint = %endpoint, "Requesting userinfo");
        let resp = self.http.get(endpoint).bearer_auth(access_token).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let rejection = if body.get("error").is_some() {
                UnauthorizedError::from_body(&body, status.as_u16())
            } else {
                UnauthorizedError::new("invalid_token", "Userinfo request rejected", status.as_u16())
            };
            tracing::warn!(status = %status, error = %rejection.error, "Userinfo request rejected");
            return Err(rejection.into());
        }

        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        let config = ClientConfig::new("https://idp.example", "c1", "s1")
            .with_redirect_uri("https://app.example/cb");
        Client::new(config).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = Client::new(ClientConfig::new("", "c1", "s1"));
        assert!(matches!(result, Err(OidcError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_state_starts_empty() {
        let client = client();
        assert!(client.provider_configuration().await.is_none());
        assert!(client.key_set().await.is_none());
    }

    #[tokio::test]
    async fn test_get_jwks_requires_discovery() {
        let err = client().get_jwks().await.unwrap_err();
        assert!(matches!(err, OidcError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_authorization_uri_requires_discovery() {
        let err = client()
            .authorization_uri(&AuthorizationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OidcError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_token_without_code_fails_first() {
        let err = client().token(&TokenRequest::default()).await.unwrap_err();
        assert!(matches!(err, OidcError::MissingCode));
    }

    #[tokio::test]
    async fn test_token_requires_discovery() {
        let err = client()
            .token(&TokenRequest::with_code("abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, OidcError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_verify_empty_token_is_missing_token() {
        let err = client()
            .verify("", &VerifyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OidcError::MissingToken));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_verify_structured_without_keys_is_configuration_error() {
        let err = client()
            .verify("eyJhbGciOiJSUzI1NiJ9.e30.c2ln", &VerifyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OidcError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_user_info_empty_token_is_missing_token() {
        let err = client().user_info("").await.unwrap_err();
        assert!(matches!(err, OidcError::MissingToken));
    }

    #[test]
    fn test_authorization_params_use_config() {
        let params = client().authorization_params(&AuthorizationOptions::default());
        assert_eq!(params.client_id, "c1");
        assert_eq!(params.redirect_uri, "https://app.example/cb");
        assert_eq!(params.scope, "openid profile");
    }
}
