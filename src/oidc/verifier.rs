//! Token verification
//!
//! A token moves through these states exactly once:
//!
//! ```text
//! Unclassified -> Structured | Opaque -> ClaimsResolved -> Validated | Rejected
//! ```
//!
//! 1. [`classify`] decides the token's form: anything containing a `.` is a
//!    structured (JWT-shaped) token, everything else is opaque.
//! 2. Structured tokens are split and decoded by [`decode_structured`], then
//!    handed to the [`SignatureVerifier`]; only its output is trusted as claims.
//!    Opaque tokens are resolved by the provider's introspection endpoint,
//!    which is authoritative for them.
//! 3. [`validate_claims`] applies issuer, audience, expiry and scope checks in
//!    that order; the first failure wins.

use std::sync::Arc;

use base64::Engine as _;
use serde_json::{json, Value};

use crate::error::{OidcError, Result, UnauthorizedError};
use crate::oidc::claims::Claims;
use crate::oidc::signature::{
    SignatureVerifier, StructuredToken, TokenHeader, ACCEPTED_ALGORITHMS,
};

/// Path appended to the issuer for opaque token introspection.
pub const INTROSPECTION_PATH: &str = "/token/verify";

// ---------------------------------------------------------------------------
// Classification and decoding
// ---------------------------------------------------------------------------

/// The two mutually exclusive forms a token can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenForm {
    /// Self-contained `header.payload.signature` token
    Structured,
    /// Reference token resolved by introspection
    Opaque,
}

/// Classifies a token by the presence of a `.` separator.
///
/// # Examples
///
/// ```
/// use oidcrp::oidc::verifier::{classify, TokenForm};
///
/// assert_eq!(classify("a.b.c"), TokenForm::Structured);
/// assert_eq!(classify("a.b"), TokenForm::Structured);
/// assert_eq!(classify("opaque123"), TokenForm::Opaque);
/// ```
pub fn classify(token: &str) -> TokenForm {
    if token.contains('.') {
        TokenForm::Structured
    } else {
        TokenForm::Opaque
    }
}

/// Splits a structured token and decodes its header and payload.
///
/// # Errors
///
/// Returns the `invalid_token`/401 rejection unless the token has exactly
/// three segments whose first two are base64url-encoded JSON.
pub fn decode_structured(token: &str) -> Result<StructuredToken> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        tracing::warn!(segments = segments.len(), "Structured token does not have three segments");
        return Err(UnauthorizedError::malformed_token().into());
    };

    let header: TokenHeader = decode_segment(header)?;
    let payload: Value = decode_segment(payload)?;

    Ok(StructuredToken {
        raw: token.to_string(),
        header,
        payload,
        signature: (*signature).to_string(),
    })
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| {
            tracing::warn!(error = %e, "Token segment is not base64url");
            OidcError::from(UnauthorizedError::malformed_token())
        })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!(error = %e, "Token segment is not JSON");
        UnauthorizedError::malformed_token().into()
    })
}

// ---------------------------------------------------------------------------
// Claim validation
// ---------------------------------------------------------------------------

/// Claim checks applied to every resolved claim set.
#[derive(Debug, Clone, Default)]
pub struct ClaimPolicy {
    /// Required `iss`
    pub issuer: String,

    /// Acceptable `aud` values; unchecked when `None`
    pub audiences: Option<Vec<String>>,

    /// Required scope entries; unchecked when `None`
    pub scope: Option<String>,
}

/// Validates claims against `policy` at time `now` (seconds since the epoch).
///
/// Checks run in a fixed order and the first failure is returned:
/// issuer, audience, expiry, scope. A missing `exp` is treated as expired.
///
/// # Examples
///
/// ```
/// use oidcrp::oidc::claims::Claims;
/// use oidcrp::oidc::verifier::{validate_claims, ClaimPolicy};
///
/// let claims = Claims {
///     iss: Some("https://idp.example".to_string()),
///     exp: Some(100.0),
///     ..Claims::default()
/// };
/// let policy = ClaimPolicy {
///     issuer: "https://idp.example".to_string(),
///     ..ClaimPolicy::default()
/// };
///
/// assert!(validate_claims(claims.clone(), &policy, 100.0).is_ok());
/// assert!(validate_claims(claims, &policy, 101.0).is_err());
/// ```
pub fn validate_claims(claims: Claims, policy: &ClaimPolicy, now: f64) -> Result<Claims> {
    if claims.iss.as_deref() != Some(policy.issuer.as_str()) {
        return Err(UnauthorizedError::mismatching_issuer().into());
    }

    if let Some(audiences) = &policy.audiences {
        let accepted = claims
            .aud
            .as_ref()
            .is_some_and(|aud| aud.is_any_of(audiences));
        if !accepted {
            return Err(UnauthorizedError::mismatching_audience().into());
        }
    }

    if !claims.exp.is_some_and(|exp| exp >= now) {
        return Err(UnauthorizedError::expired().into());
    }

    if let Some(scope) = &policy.scope {
        if !claims.has_scope(scope) {
            return Err(UnauthorizedError::insufficient_scope().into());
        }
    }

    Ok(claims)
}

// ---------------------------------------------------------------------------
// TokenVerifier
// ---------------------------------------------------------------------------

/// Inputs to a single verification.
#[derive(Debug, Clone, Default)]
pub struct VerificationOptions {
    /// Expected issuer; also the base of the introspection URL
    pub issuer: String,

    /// Client id used to authenticate introspection
    pub client_id: String,

    /// Client secret used to authenticate introspection
    pub client_secret: String,

    /// Acceptable audiences
    pub audiences: Option<Vec<String>>,

    /// Required scope
    pub scope: Option<String>,

    /// JWK used for structured tokens
    pub signing_key: Option<Value>,
}

impl VerificationOptions {
    /// Claim policy derived from these options.
    pub fn policy(&self) -> ClaimPolicy {
        ClaimPolicy {
            issuer: self.issuer.clone(),
            audiences: self.audiences.clone(),
            scope: self.scope.clone(),
        }
    }

    fn introspection_url(&self) -> String {
        format!("{}{}", self.issuer.trim_end_matches('/'), INTROSPECTION_PATH)
    }
}

/// Resolves and validates tokens.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use oidcrp::oidc::signature::JwkSignatureVerifier;
/// use oidcrp::oidc::verifier::{TokenVerifier, VerificationOptions};
///
/// # async fn example() -> oidcrp::Result<()> {
/// let verifier = TokenVerifier::new(
///     Arc::new(reqwest::Client::new()),
///     Arc::new(JwkSignatureVerifier),
/// );
/// let options = VerificationOptions {
///     issuer: "https://idp.example".to_string(),
///     client_id: "c1".to_string(),
///     client_secret: "s1".to_string(),
///     ..VerificationOptions::default()
/// };
/// let claims = verifier.verify("opaque123", &options).await?;
/// println!("subject: {:?}", claims.sub);
/// # Ok(())
/// # }
/// ```
pub struct TokenVerifier {
    http: Arc<reqwest::Client>,
    signature: Arc<dyn SignatureVerifier>,
}

impl TokenVerifier {
    /// Creates a verifier using `signature` for structured tokens.
    pub fn new(http: Arc<reqwest::Client>, signature: Arc<dyn SignatureVerifier>) -> Self {
        Self { http, signature }
    }

    /// Classifies, resolves and validates `token`.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Unauthorized`] for every rejection,
    /// [`OidcError::Http`] for introspection transport failures and
    /// [`OidcError::Configuration`] when a structured token arrives without a
    /// signing key to check it against.
    pub async fn verify(&self, token: &str, options: &VerificationOptions) -> Result<Claims> {
        let result = match classify(token) {
            TokenForm::Structured => self.resolve_structured(token, options),
            TokenForm::Opaque => self.introspect(token, options).await,
        }
        .and_then(|claims| validate_claims(claims, &options.policy(), now()));

        if let Err(OidcError::Unauthorized(rejection)) = &result {
            tracing::warn!(
                error = %rejection.error,
                status = rejection.status_code,
                description = %rejection.description,
                "Token rejected"
            );
        }

        result
    }

    fn resolve_structured(&self, token: &str, options: &VerificationOptions) -> Result<Claims> {
        let structured = decode_structured(token)?;

        let key = options.signing_key.as_ref().ok_or_else(|| {
            OidcError::Configuration(
                "no signing key available for structured token verification".to_string(),
            )
        })?;

        let payload = self.signature.verify(&structured, key, ACCEPTED_ALGORITHMS)?;
        serde_json::from_value(payload).map_err(|e| {
            tracing::warn!(error = %e, "Token payload is not a claim set");
            UnauthorizedError::malformed_token().into()
        })
    }

    async fn introspect(&self, token: &str, options: &VerificationOptions) -> Result<Claims> {
        let url = options.introspection_url();
        tracing::debug!(url = %url, "Introspecting opaque token");

        let resp = self
            .http
            .post(&url)
            .basic_auth(&options.client_id, Some(&options.client_secret))
            .json(&json!({ "access_token": token }))
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await?;

        if body.get("error").is_some() || !status.is_success() {
            let fallback = if status.is_success() {
                401
            } else {
                status.as_u16()
            };
            return Err(UnauthorizedError::from_body(&body, fallback).into());
        }

        serde_json::from_value(body).map_err(|e| {
            tracing::warn!(error = %e, "Introspection response is not a claim set");
            UnauthorizedError::malformed_token().into()
        })
    }
}

fn now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
