//! Tracing setup for the `fnrun` binary.
//!
//! Logs always go to stderr: stdout carries the encoded function result and nothing else.
//! The filter comes from `FNRUN_LOG` when set, then the configured `log_filter`, then
//! `warn` (`debug` for `--debug` invocations).

use crate::error::{FnError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

pub const LOG_ENV_VAR: &str = "FNRUN_LOG";

/// Builds the filter directive used when `FNRUN_LOG` is not set.
pub fn default_directive(config_filter: Option<&str>, debug: bool) -> String {
    match config_filter {
        Some(filter) if !filter.trim().is_empty() => filter.to_string(),
        _ if debug => "debug".to_string(),
        _ => "warn".to_string(),
    }
}

pub fn init_logging(config_filter: Option<&str>, debug: bool) -> Result<()> {
    let directive = default_directive(config_filter, debug);
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(&directive))
        .map_err(|e| FnError::Config(format!("invalid log filter '{}': {}", directive, e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false);

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| FnError::Config(format!("logging already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_filter_wins() {
        assert_eq!(default_directive(Some("fnrun=trace"), true), "fnrun=trace");
    }

    #[test]
    fn debug_raises_default_level() {
        assert_eq!(default_directive(None, true), "debug");
        assert_eq!(default_directive(Some("  "), true), "debug");
        assert_eq!(default_directive(None, false), "warn");
    }
}
