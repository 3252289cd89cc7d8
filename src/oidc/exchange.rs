//! Authorization code exchange
//!
//! Trades an authorization code for tokens at the provider's token endpoint,
//! then verifies the returned ID token and access token concurrently. Both
//! verifications always run to completion; the exchange succeeds only when
//! both do.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{OidcError, Result, UnauthorizedError};
use crate::oidc::claims::Claims;
use crate::oidc::discovery::ProviderConfiguration;
use crate::oidc::jwks::KeySet;
use crate::oidc::signature::{IdTokenOptions, IdTokenVerifier};
use crate::oidc::verifier::{TokenVerifier, VerificationOptions};

/// Grant type sent when the caller does not override it.
pub const DEFAULT_GRANT_TYPE: &str = "authorization_code";

/// Caller input for a token exchange.
///
/// The code is taken from `code` when set, otherwise from the `code` query
/// parameter of `response_uri`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Full redirect-back URL received from the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

impl TokenRequest {
    /// Request carrying a code directly.
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Request carrying the redirect-back URL.
    pub fn with_response_uri(response_uri: impl Into<String>) -> Self {
        Self {
            response_uri: Some(response_uri.into()),
            ..Self::default()
        }
    }

    /// Resolves the authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::MissingCode`] when neither source yields a
    /// non-empty code.
    ///
    /// # Examples
    ///
    /// ```
    /// use oidcrp::oidc::exchange::TokenRequest;
    ///
    /// let request = TokenRequest::with_response_uri("https://app.example/cb?state=s&code=abc");
    /// assert_eq!(request.authorization_code().unwrap(), "abc");
    /// assert!(TokenRequest::default().authorization_code().is_err());
    /// ```
    pub fn authorization_code(&self) -> Result<String> {
        if let Some(code) = self.code.as_deref().filter(|c| !c.is_empty()) {
            return Ok(code.to_string());
        }

        self.response_uri
            .as_deref()
            .and_then(code_from_response_uri)
            .ok_or(OidcError::MissingCode)
    }
}

fn code_from_response_uri(response_uri: &str) -> Option<String> {
    let (_, query) = response_uri.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

/// Token endpoint response, with verified claims attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,

    pub id_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Verified ID token claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_claims: Option<Claims>,

    /// Verified access token claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_claims: Option<Claims>,

    /// Other response members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Orchestrates the code-for-tokens exchange.
pub struct TokenExchange {
    http: Arc<reqwest::Client>,
    id_tokens: Arc<dyn IdTokenVerifier>,
    access_tokens: Arc<TokenVerifier>,
}

impl TokenExchange {
    /// Creates an exchange using the given verification collaborators.
    pub fn new(
        http: Arc<reqwest::Client>,
        id_tokens: Arc<dyn IdTokenVerifier>,
        access_tokens: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            http,
            id_tokens,
            access_tokens,
        }
    }

    /// Exchanges the request's code and verifies both returned tokens.
    ///
    /// # Errors
    ///
    /// - [`OidcError::MissingCode`] before any network call when no code resolves
    /// - [`OidcError::Configuration`] when the provider has no token endpoint or
    ///   the key set is empty
    /// - [`OidcError::Unauthorized`] for a token endpoint error response or a
    ///   failed verification
    /// - [`OidcError::Http`] for transport failures
    pub async fn exchange(
        &self,
        config: &ClientConfig,
        provider: &ProviderConfiguration,
        keys: &KeySet,
        request: &TokenRequest,
    ) -> Result<TokenSet> {
        let code = request.authorization_code()?;
        let token_endpoint = provider.token_endpoint()?;
        let signing_key = keys.first().cloned().ok_or_else(|| {
            OidcError::Configuration("no signing key available in key set".to_string())
        })?;

        let mut tokens = self
            .request_tokens(config, token_endpoint, &code, request)
            .await?;

        let id_options = IdTokenOptions {
            issuer: config.issuer.clone(),
            audience: config.client_id.clone(),
            key: signing_key.clone(),
        };
        let access_options = VerificationOptions {
            issuer: config.issuer.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            signing_key: Some(signing_key),
            ..VerificationOptions::default()
        };

        let (id_result, access_result) = tokio::join!(
            self.id_tokens.verify_id_token(&tokens.id_token, &id_options),
            self.access_tokens.verify(&tokens.access_token, &access_options),
        );

        tokens.id_claims = Some(id_result?);
        tokens.access_claims = Some(access_result?);

        tracing::info!(
            subject = ?tokens.id_claims.as_ref().and_then(|c| c.sub.as_deref()),
            "Authorization code exchanged"
        );

        Ok(tokens)
    }

    async fn request_tokens(
        &self,
        config: &ClientConfig,
        token_endpoint: &str,
        code: &str,
        request: &TokenRequest,
    ) -> Result<TokenSet> {
        let grant_type = request.grant_type.as_deref().unwrap_or(DEFAULT_GRANT_TYPE);
        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .unwrap_or(config.redirect_uri.as_str());

        let params = [
            ("grant_type", grant_type),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        tracing::debug!(token_endpoint = %token_endpoint, grant_type = %grant_type, "Requesting tokens");

        let resp = self
            .http
            .post(token_endpoint)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            tracing::warn!(status = %status, "Token endpoint returned an error");
            return Err(endpoint_error(&text, status.as_u16()).into());
        }

        let body: Value = serde_json::from_str(&text)?;
        if body.get("error").is_some() {
            return Err(UnauthorizedError::from_body(&body, 400).into());
        }

        Ok(serde_json::from_value(body)?)
    }
}

fn endpoint_error(text: &str, status: u16) -> UnauthorizedError {
    match serde_json::from_str::<Value>(text) {
        Ok(body) if body.get("error").is_some() => UnauthorizedError::from_body(&body, status),
        _ => UnauthorizedError::new("server_error", text.trim(), status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_code_wins_over_response_uri() {
        let request = TokenRequest {
            code: Some("direct".to_string()),
            response_uri: Some("https://app.example/cb?code=from-uri".to_string()),
            ..TokenRequest::default()
        };
        assert_eq!(request.authorization_code().unwrap(), "direct");
    }

    #[test]
    fn test_code_from_response_uri_is_decoded() {
        let request = TokenRequest::with_response_uri("https://app.example/cb?code=a%2Fb+c&state=s");
        assert_eq!(request.authorization_code().unwrap(), "a/b c");
    }

    #[test]
    fn test_code_from_response_uri_ignores_fragment() {
        let request = TokenRequest::with_response_uri("https://app.example/cb?code=abc#code=frag");
        assert_eq!(request.authorization_code().unwrap(), "abc");
    }

    #[test]
    fn test_missing_code_without_query() {
        let request = TokenRequest::with_response_uri("https://app.example/cb");
        assert!(matches!(
            request.authorization_code(),
            Err(OidcError::MissingCode)
        ));
    }

    #[test]
    fn test_missing_code_with_empty_values() {
        let request = TokenRequest {
            code: Some(String::new()),
            response_uri: Some("https://app.example/cb?code=&state=s".to_string()),
            ..TokenRequest::default()
        };
        assert!(matches!(
            request.authorization_code(),
            Err(OidcError::MissingCode)
        ));
    }

    #[test]
    fn test_endpoint_error_from_oauth_body() {
        let err = endpoint_error(
            r#"{"error": "invalid_grant", "error_description": "code expired"}"#,
            400,
        );
        assert_eq!(err.error, "invalid_grant");
        assert_eq!(err.description, "code expired");
        assert_eq!(err.status_code, 400);
    }

    #[test]
    fn test_endpoint_error_from_plain_text() {
        let err = endpoint_error("Bad Gateway\n", 502);
        assert_eq!(err.error, "server_error");
        assert_eq!(err.description, "Bad Gateway");
        assert_eq!(err.status_code, 502);
    }

    #[test]
    fn test_token_set_keeps_extra_members() {
        let tokens: TokenSet = serde_json::from_str(
            r#"{"access_token": "x", "id_token": "y", "token_type": "Bearer", "session_state": "s1"}"#,
        )
        .unwrap();
        assert_eq!(tokens.token_type.as_deref(), Some("Bearer"));
        assert_eq!(tokens.extra["session_state"], "s1");
        assert!(tokens.id_claims.is_none());
    }
}
