//! Synchronization and changelog settings.

use crate::models::SchemaAllowlist;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of commits inspected when recovering the cutoff or building a changelog.
pub const DEFAULT_LOOKBACK: usize = 15;

/// Upper bound on extraction workers, and so on open catalog sessions.
pub const MAX_CONCURRENCY: usize = 16;

/// Settings for one synchronization run.
///
/// # Example
/// ```rust
/// use ddlsnap_core::config::SyncConfig;
/// use ddlsnap_core::models::SchemaAllowlist;
///
/// let config = SyncConfig::new("/srv/ddl", SchemaAllowlist::new(["HR"]))
///     .with_push(false)
///     .with_concurrency(2);
///
/// assert_eq!(config.lookback, 15);
/// assert!(!config.push);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Working tree of the snapshot repository
    pub root: PathBuf,
    /// Owners whose objects are synchronized
    pub schemas: SchemaAllowlist,
    /// Extraction workers, each with its own catalog session
    pub concurrency: usize,
    /// Commits scanned when recovering the previous watermark
    pub lookback: usize,
    /// Whether the sync commit is pushed
    pub push: bool,
    /// Remote to push to; the branch's configured upstream when unset
    pub remote: Option<String>,
}

impl SyncConfig {
    /// Creates a sync config with defaults for everything but root and schemas.
    pub fn new(root: impl Into<PathBuf>, schemas: SchemaAllowlist) -> Self {
        Self {
            root: root.into(),
            schemas,
            concurrency: 1,
            lookback: DEFAULT_LOOKBACK,
            push: true,
            remote: None,
        }
    }

    /// Builder method to set the worker count.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Builder method to set the cutoff lookback window.
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// Builder method to enable or disable pushing.
    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Builder method to set the push remote.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Validates the settings.
    ///
    /// An empty schema allow-list is valid: it matches nothing.
    ///
    /// # Errors
    /// Returns error if a value is out of range or the root is not a directory
    pub fn validate(&self) -> crate::Result<()> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(crate::error::DdlSnapError::configuration(format!(
                "concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            )));
        }

        if self.lookback == 0 {
            return Err(crate::error::DdlSnapError::configuration(
                "lookback must be greater than 0",
            ));
        }

        if !self.root.is_dir() {
            return Err(crate::error::DdlSnapError::configuration(format!(
                "snapshot root {} is not a directory",
                self.root.display()
            )));
        }

        if let Some(remote) = &self.remote
            && remote.trim().is_empty()
        {
            return Err(crate::error::DdlSnapError::configuration(
                "remote name cannot be empty",
            ));
        }

        if self.schemas.is_empty() {
            tracing::warn!("Schema allow-list is empty; no objects will be synchronized");
        }

        Ok(())
    }
}

/// Settings for changelog rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogConfig {
    /// Number of most recent commits rendered
    pub lookback: usize,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

impl ChangelogConfig {
    /// Validates the settings.
    ///
    /// # Errors
    /// Returns error if the lookback window is zero
    pub fn validate(&self) -> crate::Result<()> {
        if self.lookback == 0 {
            return Err(crate::error::DdlSnapError::configuration(
                "lookback must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::new("/tmp", SchemaAllowlist::new(["HR"]));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.lookback, DEFAULT_LOOKBACK);
        assert!(config.push);
        assert_eq!(config.remote, None);
    }

    #[test]
    fn test_sync_config_validation() {
        let dir = tempfile::tempdir().unwrap();
        let base = SyncConfig::new(dir.path(), SchemaAllowlist::new(["HR"]));
        assert!(base.validate().is_ok());

        assert!(base.clone().with_concurrency(0).validate().is_err());
        assert!(
            base.clone()
                .with_concurrency(MAX_CONCURRENCY + 1)
                .validate()
                .is_err()
        );
        assert!(base.clone().with_lookback(0).validate().is_err());
        assert!(base.clone().with_remote("  ").validate().is_err());
        assert!(base.clone().with_remote("origin").validate().is_ok());

        let missing = SyncConfig::new(dir.path().join("absent"), SchemaAllowlist::new(["HR"]));
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_empty_allowlist_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::new(dir.path(), SchemaAllowlist::none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_changelog_config() {
        assert_eq!(ChangelogConfig::default().lookback, 15);
        assert!(ChangelogConfig { lookback: 0 }.validate().is_err());
    }
}
