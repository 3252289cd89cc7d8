//! Error types for oidcrp
//!
//! This module defines the error taxonomy shared by discovery, key retrieval,
//! token exchange and token verification, using `thiserror` for ergonomic
//! error handling.
//!
//! Token rejections are carried as an [`UnauthorizedError`], an OAuth2-shaped
//! value (`error`, `error_description`, status code, optional realm) that a
//! resource server can map straight onto an HTTP response.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Realm reported on rejections produced by local token verification.
pub const DEFAULT_REALM: &str = "user";

/// Main error type for oidcrp operations
#[derive(Error, Debug)]
pub enum OidcError {
    /// Provider configuration is absent or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or transport failure, passed through unmodified
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A token or credential was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(UnauthorizedError),

    /// No authorization code could be resolved for the token exchange
    #[error("Missing authorization code")]
    MissingCode,

    /// A bearer token was required but not supplied
    #[error("Missing bearer token")]
    MissingToken,

    /// A configured or discovered URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OidcError {
    /// HTTP status code a caller should map this error onto.
    ///
    /// Rejections keep their own status (401 for malformed tokens, 403 for
    /// claim mismatches), input errors map to 400, transport failures to 502
    /// and everything else to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            OidcError::Unauthorized(err) => err.status_code,
            OidcError::MissingCode | OidcError::MissingToken => 400,
            OidcError::Http(_) => 502,
            _ => 500,
        }
    }

    /// Returns the inner [`UnauthorizedError`] when this is a rejection.
    pub fn as_unauthorized(&self) -> Option<&UnauthorizedError> {
        match self {
            OidcError::Unauthorized(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UnauthorizedError> for OidcError {
    fn from(err: UnauthorizedError) -> Self {
        OidcError::Unauthorized(err)
    }
}

/// Result type alias for oidcrp operations
pub type Result<T> = std::result::Result<T, OidcError>;

// ---------------------------------------------------------------------------
// UnauthorizedError
// ---------------------------------------------------------------------------

/// OAuth2-shaped rejection of a token.
///
/// Constructed only through the named constructors below so that every
/// rejection site produces the same `error` code, description and status.
///
/// # Examples
///
/// ```
/// use oidcrp::error::UnauthorizedError;
///
/// let err = UnauthorizedError::expired();
/// assert_eq!(err.error, "invalid_token");
/// assert_eq!(err.status_code, 403);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnauthorizedError {
    /// OAuth2 error code (`invalid_token`, `insufficient_scope`, ...).
    pub error: String,

    /// Human-readable description.
    #[serde(rename = "error_description")]
    pub description: String,

    /// HTTP status code associated with the rejection.
    pub status_code: u16,

    /// Authentication realm, present on locally produced rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

impl UnauthorizedError {
    /// Creates a rejection with an explicit code, description and status.
    pub fn new(error: impl Into<String>, description: impl Into<String>, status_code: u16) -> Self {
        Self {
            error: error.into(),
            description: description.into(),
            status_code,
            realm: None,
        }
    }

    /// Sets the realm reported in the `WWW-Authenticate` challenge.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// The token is not a well-formed three-segment token.
    pub fn malformed_token() -> Self {
        Self::new("invalid_token", "Invalid access token", 401).with_realm(DEFAULT_REALM)
    }

    /// The `iss` claim does not match the configured issuer.
    pub fn mismatching_issuer() -> Self {
        Self::new("invalid_token", "Mismatching issuer", 403)
    }

    /// The `aud` claim is not one of the acceptable client ids.
    pub fn mismatching_audience() -> Self {
        Self::new("invalid_token", "Mismatching audience", 403)
    }

    /// The `exp` claim lies in the past.
    pub fn expired() -> Self {
        Self::new("invalid_token", "Expired access token", 403)
    }

    /// The `scope` claim does not cover the required scope.
    pub fn insufficient_scope() -> Self {
        Self::new("insufficient_scope", "Insufficient scope", 403)
    }

    /// Builds a rejection from a provider error body.
    ///
    /// The body's `error` and `error_description` are used verbatim. The
    /// status is taken from a `statusCode` or `status_code` field in the body
    /// when present, otherwise `fallback_status` is used.
    pub fn from_body(body: &serde_json::Value, fallback_status: u16) -> Self {
        let error = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("invalid_token");
        let description = body
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or(error);
        let status_code = ["statusCode", "status_code"]
            .iter()
            .find_map(|key| body.get(*key).and_then(|v| v.as_u64()))
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or(fallback_status);

        Self::new(error, description, status_code)
    }

    /// Renders the value of a `WWW-Authenticate: Bearer` challenge header.
    pub fn www_authenticate(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(realm) = &self.realm {
            parts.push(format!("realm=\"{realm}\""));
        }
        parts.push(format!("error=\"{}\"", self.error));
        parts.push(format!("error_description=\"{}\"", self.description));
        format!("Bearer {}", parts.join(", "))
    }
}

impl std::fmt::Display for UnauthorizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.error, self.status_code, self.description
        )
    }
}

impl std::error::Error for UnauthorizedError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_configuration_error_display() {
        let error = OidcError::Configuration("unable to retrieve configuration".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: unable to retrieve configuration"
        );
    }

    #[test]
    fn test_missing_code_error_display() {
        assert_eq!(OidcError::MissingCode.to_string(), "Missing authorization code");
    }

    #[test]
    fn test_malformed_token_is_401_with_user_realm() {
        let err = UnauthorizedError::malformed_token();
        assert_eq!(err.error, "invalid_token");
        assert_eq!(err.description, "Invalid access token");
        assert_eq!(err.status_code, 401);
        assert_eq!(err.realm.as_deref(), Some("user"));
    }

    #[test]
    fn test_claim_rejections_are_403() {
        for err in [
            UnauthorizedError::mismatching_issuer(),
            UnauthorizedError::mismatching_audience(),
            UnauthorizedError::expired(),
            UnauthorizedError::insufficient_scope(),
        ] {
            assert_eq!(err.status_code, 403, "{err}");
            assert!(err.realm.is_none());
        }
    }

    #[test]
    fn test_insufficient_scope_code() {
        let err = UnauthorizedError::insufficient_scope();
        assert_eq!(err.error, "insufficient_scope");
        assert_eq!(err.description, "Insufficient scope");
    }

    #[test]
    fn test_from_body_takes_status_code_from_body() {
        let body = json!({"error": "invalid_token", "error_description": "revoked", "statusCode": 401});
        let err = UnauthorizedError::from_body(&body, 400);
        assert_eq!(err.error, "invalid_token");
        assert_eq!(err.description, "revoked");
        assert_eq!(err.status_code, 401);
    }

    #[test]
    fn test_from_body_accepts_snake_case_status() {
        let body = json!({"error": "invalid_client", "status_code": 403});
        let err = UnauthorizedError::from_body(&body, 400);
        assert_eq!(err.status_code, 403);
        assert_eq!(err.description, "invalid_client");
    }

    #[test]
    fn test_from_body_falls_back_to_given_status() {
        let body = json!({"error": "invalid_token"});
        let err = UnauthorizedError::from_body(&body, 401);
        assert_eq!(err.status_code, 401);
    }

    #[test]
    fn test_www_authenticate_includes_realm_when_present() {
        let header = UnauthorizedError::malformed_token().www_authenticate();
        assert_eq!(
            header,
            r#"Bearer realm="user", error="invalid_token", error_description="Invalid access token""#
        );
    }

    #[test]
    fn test_www_authenticate_without_realm() {
        let header = UnauthorizedError::insufficient_scope().www_authenticate();
        assert!(header.starts_with("Bearer error=\"insufficient_scope\""));
    }

    #[test]
    fn test_unauthorized_serializes_oauth_shape() {
        let value = serde_json::to_value(UnauthorizedError::expired()).unwrap();
        assert_eq!(value["error"], "invalid_token");
        assert_eq!(value["error_description"], "Expired access token");
        assert_eq!(value["status_code"], 403);
        assert!(value.get("realm").is_none());
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            OidcError::from(UnauthorizedError::malformed_token()).status_code(),
            401
        );
        assert_eq!(OidcError::MissingToken.status_code(), 400);
        assert_eq!(
            OidcError::Configuration("x".to_string()).status_code(),
            500
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: OidcError = json_error.into();
        assert!(matches!(error, OidcError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OidcError>();
    }
}
