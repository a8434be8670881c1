//! Catalog connection configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest accepted round-trip timeout.
pub const MAX_CALL_TIMEOUT: Duration = Duration::from_secs(3600);

/// Configuration for catalog connections.
///
/// The number of sessions is not configured here: each extraction worker
/// opens one, so it follows [`super::SyncConfig::concurrency`].
///
/// # Security
/// This struct intentionally does NOT store passwords or credentials.
///
/// # Example
/// ```rust
/// use ddlsnap_core::config::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::default().with_call_timeout(Duration::from_secs(120));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Upper bound for a single round-trip to the database
    pub call_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionConfig(call_timeout: {:?})", self.call_timeout)
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if the call timeout is zero or excessive
    pub fn validate(&self) -> crate::Result<()> {
        if self.call_timeout.is_zero() {
            return Err(crate::error::DdlSnapError::configuration(
                "call_timeout must be greater than 0",
            ));
        }

        if self.call_timeout > MAX_CALL_TIMEOUT {
            return Err(crate::error::DdlSnapError::configuration(format!(
                "call_timeout should not exceed {} seconds",
                MAX_CALL_TIMEOUT.as_secs()
            )));
        }

        Ok(())
    }

    /// Builder method to set the round-trip timeout.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.call_timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_config_validation() {
        let config = ConnectionConfig::default().with_call_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_call_timeout(MAX_CALL_TIMEOUT);
        assert!(config.validate().is_ok());

        let config = ConnectionConfig::default()
            .with_call_timeout(MAX_CALL_TIMEOUT + Duration::from_secs(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_config_display() {
        let display = ConnectionConfig::default()
            .with_call_timeout(Duration::from_secs(5))
            .to_string();
        assert_eq!(display, "ConnectionConfig(call_timeout: 5s)");
    }
}
