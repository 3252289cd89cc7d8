//! OpenID Connect relying-party protocol
//!
//! # Module Layout
//!
//! - [`discovery`]     -- provider metadata (`/.well-known/openid-configuration`)
//! - [`jwks`]          -- signing key retrieval, indexed by declared use
//! - [`authorization`] -- authorization redirect URL construction
//! - [`claims`]        -- the claim set shared by both verification paths
//! - [`signature`]     -- signature and ID-token verification capabilities
//! - [`verifier`]      -- token classification, resolution and claim checks
//! - [`exchange`]      -- authorization code for token exchange

pub mod authorization;
pub mod claims;
pub mod discovery;
pub mod exchange;
pub mod jwks;
pub mod signature;
pub mod verifier;
