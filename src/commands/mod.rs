//! Command handlers for the CLI
//!
//! Each handler builds a [`Client`] from the loaded configuration, performs
//! the provider round trips it needs and prints the result as pretty JSON on
//! stdout. Logs go to stderr so the output stays machine readable.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::client::{Client, VerifyOptions};
use crate::config::ClientConfig;
use crate::oidc::authorization::AuthorizationOptions;
use crate::oidc::exchange::TokenRequest;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

async fn discovered_client(config: ClientConfig) -> Result<Client> {
    let client = Client::new(config)?;
    client.discover().await?;
    Ok(client)
}

/// Print the provider configuration.
pub async fn discover(config: ClientConfig) -> Result<()> {
    let client = Client::new(config)?;
    let provider = client.discover().await?;
    print_json(provider.as_ref())
}

/// Print the augmented JWKS document.
pub async fn jwks(config: ClientConfig) -> Result<()> {
    let client = discovered_client(config).await?;
    let keys = client.get_jwks().await?;
    print_json(keys.as_ref())
}

/// Print the authorization redirect URL.
pub async fn authorize_url(config: ClientConfig, options: AuthorizationOptions) -> Result<()> {
    let client = discovered_client(config).await?;
    let uri = client.authorization_uri(&options).await?;
    println!("{}", uri);
    Ok(())
}

/// Exchange a code and print the verified token set.
pub async fn exchange(config: ClientConfig, request: TokenRequest) -> Result<()> {
    // Fail on a missing code before touching the network
    request.authorization_code()?;

    let client = discovered_client(config).await?;
    client.get_jwks().await?;
    let tokens = client.token(&request).await?;
    print_json(&tokens)
}

/// Verify a token and print its claims.
///
/// Keys are fetched only for structured tokens; opaque tokens go straight to
/// introspection.
pub async fn verify(config: ClientConfig, token: &str, options: VerifyOptions) -> Result<()> {
    let client = Client::new(config)?;
    if token.contains('.') && options.key.is_none() {
        client.discover().await?;
        client.get_jwks().await?;
    }

    match client.verify(token, &options).await {
        Ok(claims) => print_json(&claims),
        Err(err) => {
            if let Some(rejection) = err.as_unauthorized() {
                print_json(rejection)?;
            }
            Err(err.into())
        }
    }
}

/// Print the UserInfo claims for an access token.
pub async fn userinfo(config: ClientConfig, token: &str) -> Result<()> {
    let client = discovered_client(config).await?;
    let claims = client.user_info(token).await?;
    print_json(&claims)
}
