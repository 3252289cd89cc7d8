//! Logging setup for the oidcrp binary
//!
//! Human-readable or JSON output on stderr, with optional file output.
//! `RUST_LOG` takes precedence over the configured level.

use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging options collected from the command line.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable text
    pub json_format: bool,

    /// Append logs to this file as well
    pub file_path: Option<String>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "oidcrp=info".to_string(),
            json_format: false,
            file_path: None,
        }
    }
}

impl LoggingOptions {
    /// Options for the given verbosity.
    pub fn for_verbosity(verbose: bool) -> Self {
        let level = if verbose { "oidcrp=debug" } else { "oidcrp=info" };
        Self {
            level: level.to_string(),
            ..Self::default()
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or the log file cannot
/// be opened.
///
/// # Examples
///
/// ```no_run
/// use oidcrp::logging::{init_logging, LoggingOptions};
///
/// init_logging(&LoggingOptions::default()).unwrap();
/// tracing::info!("ready");
/// ```
pub fn init_logging(options: &LoggingOptions) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&options.level))?;

    let file = match &options.file_path {
        Some(path) => Some(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    if options.json_format {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        let file_layer = file.map(|file| fmt::layer().json().with_writer(file));
        registry.with(stderr_layer).with(file_layer).try_init()?;
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        let file_layer = file.map(|file| fmt::layer().with_ansi(false).with_writer(file));
        registry.with(stderr_layer).with(file_layer).try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(LoggingOptions::default().level, "oidcrp=info");
    }

    #[test]
    fn test_verbose_level() {
        let options = LoggingOptions::for_verbosity(true);
        assert_eq!(options.level, "oidcrp=debug");
        assert!(!options.json_format);
    }

    #[test]
    fn test_unwritable_log_file_is_error() {
        let options = LoggingOptions {
            file_path: Some("/nonexistent/dir/oidcrp.log".to_string()),
            ..LoggingOptions::default()
        };
        assert!(init_logging(&options).is_err());
    }
}
