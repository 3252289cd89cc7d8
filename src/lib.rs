//! oidcrp - OpenID Connect relying-party client library
//!
//! This library implements the client side of OAuth 2.0 / OpenID Connect:
//! provider discovery, signing key retrieval, authorization URL construction,
//! authorization code exchange, and verification of both structured (signed)
//! and opaque (introspected) tokens.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `oidc`: protocol building blocks (discovery, keys, authorization,
//!   exchange, verification)
//! - `client`: the [`Client`] façade holding configuration and cached
//!   provider state
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`, `commands`, `logging`: the command-line tool
//!
//! # Example
//!
//! ```no_run
//! use oidcrp::{Client, ClientConfig, VerifyOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::load("oidcrp.yaml")?;
//!     let client = Client::new(config)?;
//!
//!     client.discover().await?;
//!     client.get_jwks().await?;
//!
//!     let claims = client.verify("opaque123", &VerifyOptions::default()).await?;
//!     println!("subject: {:?}", claims.sub);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod oidc;

// Re-export commonly used types
pub use client::{Client, VerifyOptions};
pub use config::ClientConfig;
pub use error::{OidcError, Result, UnauthorizedError};
pub use oidc::claims::{Audience, Claims};
pub use oidc::exchange::{TokenRequest, TokenSet};
