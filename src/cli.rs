//! Command-line interface definition for oidcrp
//!
//! This module defines the CLI structure using clap's derive API. Each
//! subcommand is a thin call through [`crate::Client`] that prints JSON.

use clap::{Parser, Subcommand};

/// oidcrp - OpenID Connect relying-party client
///
/// Discover a provider, fetch its keys, build authorization URLs, exchange
/// codes and verify tokens from the command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "oidcrp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "OIDCRP_CONFIG", default_value = "oidcrp.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for oidcrp
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Fetch and print the provider configuration
    Discover,

    /// Fetch and print the provider's signing keys
    Jwks,

    /// Print the authorization redirect URL
    AuthorizeUrl {
        /// Endpoint path replacing the default `authorize`
        #[arg(long)]
        endpoint: Option<String>,

        /// Override the configured redirect URI
        #[arg(long)]
        redirect_uri: Option<String>,

        /// Override the resolved scope
        #[arg(long)]
        scope: Option<String>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        nonce: Option<String>,

        /// Additional parameter as KEY=VALUE (repeatable)
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Exchange an authorization code and verify the returned tokens
    Exchange {
        /// Authorization code
        #[arg(long, conflicts_with = "response_uri")]
        code: Option<String>,

        /// Full redirect-back URL carrying the code
        #[arg(long)]
        response_uri: Option<String>,

        /// Override the configured redirect URI
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Verify a bearer token and print its claims
    Verify {
        /// Token to verify
        token: String,

        /// Acceptable audience (repeatable)
        #[arg(short, long = "audience")]
        audiences: Vec<String>,

        /// Required scope, instead of the configured one
        #[arg(long)]
        scope: Option<String>,

        /// Select the signing key by declared use
        #[arg(long)]
        key_use: Option<String>,
    },

    /// Fetch UserInfo claims for an access token
    Userinfo {
        /// Access token
        token: String,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("oidcrp.yaml".to_string()),
            verbose: false,
            json_logs: false,
            log_file: None,
            command: Commands::Discover,
        }
    }
}
