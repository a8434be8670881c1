//! Recovery of the previous synchronization watermark from commit history.
//!
//! Sync commits are titled with the run watermark (`YYYY-MM-DDTHH:MM:SS`),
//! so the log itself is the only sync state. Hand-made commits in between
//! are skipped as long as a sync commit remains inside the lookback window.

use crate::{
    Result,
    models::{WATERMARK_FORMAT, WATERMARK_LEN, sentinel_cutoff},
    vcs::VersionControl,
};
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Parses the watermark prefix of a commit message.
///
/// # Example
/// ```rust
/// use ddlsnap_core::cutoff::parse_watermark;
///
/// assert!(parse_watermark("2024-05-01T10:00:00").is_some());
/// assert!(parse_watermark("2024-05-01T10:00:00 manual fixups").is_some());
/// assert!(parse_watermark("Add README").is_none());
/// ```
pub fn parse_watermark(message: &str) -> Option<NaiveDateTime> {
    let prefix = message.get(..WATERMARK_LEN)?;
    NaiveDateTime::parse_from_str(prefix, WATERMARK_FORMAT).ok()
}

/// Resolves the cutoff for the next sync run.
pub struct CutoffResolver {
    vcs: Arc<dyn VersionControl>,
    lookback: usize,
}

impl CutoffResolver {
    /// Creates a resolver scanning the newest `lookback` commits.
    pub fn new(vcs: Arc<dyn VersionControl>, lookback: usize) -> Self {
        Self { vcs, lookback }
    }

    /// Returns the watermark of the newest sync commit in the window, or the
    /// sentinel when there is none.
    ///
    /// # Errors
    /// Returns error if the commit log cannot be read
    pub async fn resolve(&self) -> Result<NaiveDateTime> {
        let commits = self.vcs.list_commits(self.lookback).await?;

        for commit in &commits {
            if let Some(watermark) = parse_watermark(&commit.message) {
                tracing::debug!("Cutoff {} from commit {}", watermark, commit.short_id());
                return Ok(watermark);
            }
        }

        tracing::info!(
            "No sync commit among the last {} commit(s), extracting everything",
            commits.len()
        );
        Ok(sentinel_cutoff())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watermark() {
        let expected =
            NaiveDateTime::parse_from_str("2024-05-01T10:00:00", WATERMARK_FORMAT).unwrap();
        assert_eq!(parse_watermark("2024-05-01T10:00:00"), Some(expected));
        let with_body = "2024-05-01T10:00:00\n\nbody";
        assert_eq!(parse_watermark(with_body), Some(expected));
        assert_eq!(parse_watermark("2024-05-01T10:00:0"), None);
        assert_eq!(parse_watermark("2024-13-01T10:00:00"), None);
        assert_eq!(parse_watermark("Initial commit"), None);
        assert_eq!(parse_watermark(""), None);
    }

    #[test]
    fn test_parse_watermark_multibyte_message() {
        assert_eq!(parse_watermark("2024-05-01T10:00:0ü"), None);
        assert_eq!(parse_watermark("Исправлен вид V_EMP"), None);
    }
}
