//! Shared logging utilities for the ddlsnap binary.
//!
//! Logs go to stderr so that stdout stays reserved for notices and
//! changelog output. `RUST_LOG`, when set, overrides the verbosity flags.

use crate::Result;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Log line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line, for log shippers
    Json,
}

/// Maps CLI verbosity flags to a tracing level.
fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

fn filter_for(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose, quiet).as_str()))
}

/// Initializes structured logging based on verbosity level.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
/// * `format` - Text or JSON lines
///
/// # Example
/// ```rust,no_run
/// use ddlsnap_core::logging::{LogFormat, init_logging};
///
/// init_logging(1, false, LogFormat::Text).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool, format: LogFormat) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };

    installed.map_err(|e| {
        crate::error::DdlSnapError::configuration(format!("Failed to initialize logging: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can be installed once per process; only the
    // level mapping is exercised here.
    #[test]
    fn test_verbosity_levels() {
        let test_cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in test_cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "quiet={}, verbose={}",
                quiet,
                verbose
            );
        }
    }

    #[test]
    fn test_log_format_names() {
        assert_eq!(LogFormat::default(), LogFormat::Text);
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");
    }
}
