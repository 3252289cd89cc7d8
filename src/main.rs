//! oidcrp - OpenID Connect relying-party client
//!
#![doc = "oidcrp - OpenID Connect relying-party client"]
#![doc = "Main entry point for the oidcrp command-line tool."]

use anyhow::Result;

use oidcrp::cli::{Cli, Commands};
use oidcrp::client::VerifyOptions;
use oidcrp::commands;
use oidcrp::config::ClientConfig;
use oidcrp::logging::{init_logging, LoggingOptions};
use oidcrp::oidc::authorization::AuthorizationOptions;
use oidcrp::oidc::exchange::TokenRequest;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    let logging = LoggingOptions {
        json_format: cli.json_logs,
        file_path: cli.log_file.clone(),
        ..LoggingOptions::for_verbosity(cli.verbose)
    };
    init_logging(&logging)?;

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("oidcrp.yaml");
    let config = ClientConfig::load(config_path)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Discover => {
            tracing::info!("Discovering provider configuration");
            commands::discover(config).await
        }
        Commands::Jwks => {
            tracing::info!("Retrieving signing keys");
            commands::jwks(config).await
        }
        Commands::AuthorizeUrl {
            endpoint,
            redirect_uri,
            scope,
            state,
            nonce,
            params,
        } => {
            let mut options = AuthorizationOptions {
                endpoint,
                redirect_uri,
                scope,
                ..AuthorizationOptions::default()
            };
            options.params.extend(params);
            if let Some(state) = state {
                options.params.insert("state".to_string(), state);
            }
            if let Some(nonce) = nonce {
                options.params.insert("nonce".to_string(), nonce);
            }
            commands::authorize_url(config, options).await
        }
        Commands::Exchange {
            code,
            response_uri,
            redirect_uri,
        } => {
            tracing::info!("Exchanging authorization code");
            let request = TokenRequest {
                code,
                response_uri,
                redirect_uri,
                ..TokenRequest::default()
            };
            commands::exchange(config, request).await
        }
        Commands::Verify {
            token,
            audiences,
            scope,
            key_use,
        } => {
            let options = VerifyOptions {
                audiences: (!audiences.is_empty()).then_some(audiences),
                scope,
                key_use,
                ..VerifyOptions::default()
            };
            commands::verify(config, &token, options).await
        }
        Commands::Userinfo { token } => commands::userinfo(config, &token).await,
    }
}
