//! Tracing setup for the evuctl CLI
//!
//! Usage:
//!   evuctl --debug ...              # Debug logging to stderr
//!   RUST_LOG=evuctl_core=debug ...  # Fine-grained log control
//!
//! Environment variables:
//!   RUST_LOG                        # Log filter (highest priority)
//!   LOG_LEVEL                       # Fallback filter, e.g. from .env.test

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (unless RUST_LOG is explicitly set)
    pub debug: bool,
    /// Fallback filter when RUST_LOG is unset
    pub log_level: Option<String>,
}

impl TracingConfig {
    fn default_filter(&self) -> String {
        if self.debug {
            "debug".to_string()
        } else {
            self.log_level.clone().unwrap_or_else(|| "info".to_string())
        }
    }
}

/// Initialize tracing with compact output on stderr
///
/// Logs go to stderr so `--format json` output on stdout stays parseable.
pub fn init(config: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.default_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug) // Show targets in debug mode
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_wins_over_log_level() {
        let config = TracingConfig {
            debug: true,
            log_level: Some("warn".to_string()),
        };
        assert_eq!(config.default_filter(), "debug");
    }

    #[test]
    fn log_level_is_the_fallback() {
        let config = TracingConfig {
            debug: false,
            log_level: Some("warn".to_string()),
        };
        assert_eq!(config.default_filter(), "warn");
        assert_eq!(TracingConfig::default().default_filter(), "info");
    }
}
