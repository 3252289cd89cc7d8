//! Signature verification capabilities
//!
//! The verifier never trusts a structured token's payload on its own. Before
//! any claim is inspected, the decoded token is handed to a
//! [`SignatureVerifier`], which must check the signature against the selected
//! key and reject any algorithm outside the accepted list. ID tokens returned
//! by the token endpoint go through an [`IdTokenVerifier`].
//!
//! [`JwkSignatureVerifier`] and [`JwtIdTokenVerifier`] are the default
//! implementations, backed by `jsonwebtoken`.

use std::str::FromStr;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OidcError, Result, UnauthorizedError};
use crate::oidc::claims::Claims;

/// Algorithms a structured token may declare.
pub const ACCEPTED_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256];

/// Decoded JOSE header of a structured token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Declared signing algorithm
    pub alg: String,

    /// Key identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Media type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// A structured token split into its decoded parts.
///
/// `payload` is decoded for inspection only; it becomes trusted claims only
/// once a [`SignatureVerifier`] has accepted the token.
#[derive(Debug, Clone)]
pub struct StructuredToken {
    /// The token as received
    pub raw: String,

    /// Decoded header segment
    pub header: TokenHeader,

    /// Decoded payload segment
    pub payload: Value,

    /// Raw base64url signature segment
    pub signature: String,
}

/// Capability that checks a structured token's signature.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies `token` against `key`, returning its payload as claims.
    ///
    /// # Errors
    ///
    /// Must fail when the declared algorithm is not in `allowed` or the
    /// signature does not match `key`.
    fn verify(&self, token: &StructuredToken, key: &Value, allowed: &[Algorithm])
        -> Result<Value>;
}

/// Options for verifying an ID token.
#[derive(Debug, Clone)]
pub struct IdTokenOptions {
    /// Expected `iss`
    pub issuer: String,

    /// Expected `aud`, the client id
    pub audience: String,

    /// JWK used to check the signature
    pub key: Value,
}

/// Capability that verifies an ID token returned by the token endpoint.
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    /// Verifies `id_token` and returns its claims.
    async fn verify_id_token(&self, id_token: &str, options: &IdTokenOptions) -> Result<Claims>;
}

/// Converts a raw JWK into a decoding key.
///
/// # Errors
///
/// Returns [`OidcError::Configuration`] when `key` is not a usable public JWK.
pub fn decoding_key(key: &Value) -> Result<DecodingKey> {
    let jwk: Jwk = serde_json::from_value(key.clone()).map_err(|e| {
        OidcError::Configuration(format!("signing key is not a valid JWK: {e}"))
    })?;
    DecodingKey::from_jwk(&jwk)
        .map_err(|e| OidcError::Configuration(format!("signing key is not usable: {e}")))
}

fn accepted_algorithm(alg: &str, allowed: &[Algorithm]) -> Result<Algorithm> {
    match Algorithm::from_str(alg) {
        Ok(algorithm) if allowed.contains(&algorithm) => Ok(algorithm),
        _ => {
            tracing::warn!(alg = %alg, "Token declares an algorithm that is not accepted");
            Err(UnauthorizedError::malformed_token().into())
        }
    }
}

// ---------------------------------------------------------------------------
// JwkSignatureVerifier
// ---------------------------------------------------------------------------

/// Signature-only verification against a JWK.
///
/// Registered claims are not validated here; issuer, audience, expiry and
/// scope are the token verifier's checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct JwkSignatureVerifier;

impl SignatureVerifier for JwkSignatureVerifier {
    fn verify(
        &self,
        token: &StructuredToken,
        key: &Value,
        allowed: &[Algorithm],
    ) -> Result<Value> {
        let algorithm = accepted_algorithm(&token.header.alg, allowed)?;
        let decoding_key = decoding_key(key)?;

        let mut validation = Validation::new(algorithm);
        validation.algorithms = allowed.to_vec();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Value>(&token.raw, &decoding_key, &validation).map_err(|e| {
            tracing::warn!(error = %e, "Token signature rejected");
            OidcError::from(UnauthorizedError::malformed_token())
        })?;

        Ok(data.claims)
    }
}

// ---------------------------------------------------------------------------
// JwtIdTokenVerifier
// ---------------------------------------------------------------------------

/// ID token verification: signature, issuer, audience and expiry.
#[derive(Debug, Default, Clone, Copy)]
pub struct JwtIdTokenVerifier;

#[async_trait]
impl IdTokenVerifier for JwtIdTokenVerifier {
    async fn verify_id_token(&self, id_token: &str, options: &IdTokenOptions) -> Result<Claims> {
        let header = jsonwebtoken::decode_header(id_token).map_err(|e| {
            tracing::warn!(error = %e, "ID token header could not be decoded");
            OidcError::from(UnauthorizedError::malformed_token())
        })?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            tracing::warn!(alg = ?header.alg, "ID token declares an algorithm that is not accepted");
            return Err(UnauthorizedError::malformed_token().into());
        }

        let decoding_key = decoding_key(&options.key)?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[options.issuer.as_str()]);
        validation.set_audience(&[options.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = 0;

        let data = decode::<Claims>(id_token, &decoding_key, &validation).map_err(|e| {
            let rejection = match e.kind() {
                ErrorKind::InvalidIssuer => UnauthorizedError::mismatching_issuer(),
                ErrorKind::InvalidAudience => UnauthorizedError::mismatching_audience(),
                ErrorKind::ExpiredSignature => UnauthorizedError::expired(),
                _ => UnauthorizedError::malformed_token(),
            };
            tracing::warn!(
                error = %rejection.error,
                status = rejection.status_code,
                cause = %e,
                "ID token rejected"
            );
            OidcError::from(rejection)
        })?;

        Ok(data.claims)
    }
}
