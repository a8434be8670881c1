//! Version-control interface and the sync committer.
//!
//! The repository history is the only persisted sync state: commit messages
//! carry the watermark, so everything the core needs from version control is
//! expressed by [`VersionControl`]. [`git::GitCli`] implements it with the
//! `git` executable; tests substitute an in-memory fake.

use crate::{
    Result,
    config::SyncConfig,
    models::{CommitRecord, TagRecord},
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod git;

pub use git::GitCli;

/// Operations on the snapshot repository.
///
/// # Object Safety
/// Used as `Arc<dyn VersionControl>` by the committer, cutoff resolver and
/// changelog builder.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Stages every working-tree change (added, modified, deleted).
    async fn stage_all(&self) -> Result<()>;

    /// Records the staged tree. Empty commits are allowed.
    async fn commit(&self, message: &str) -> Result<()>;

    /// Publishes the current branch to `remote`, or to its configured upstream.
    async fn push(&self, remote: Option<&str>) -> Result<()>;

    /// Newest `limit` commits reachable from HEAD, newest first.
    /// A repository without commits yields an empty list.
    async fn list_commits(&self, limit: usize) -> Result<Vec<CommitRecord>>;

    /// All tags, each resolved to the commit it points at.
    async fn list_tags(&self) -> Result<Vec<TagRecord>>;

    /// Paths that differ between the trees of two commits.
    async fn diff_paths(&self, from: &str, to: &str) -> Result<Vec<String>>;
}

/// Persists a sync run: stage all, commit, then push.
///
/// No retry and no rollback: when the push fails the local commit stays in
/// place and the error is returned.
#[derive(Clone)]
pub struct Committer {
    vcs: Arc<dyn VersionControl>,
    push: bool,
    remote: Option<String>,
}

impl std::fmt::Debug for Committer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Committer")
            .field("push", &self.push)
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

impl Committer {
    /// Creates a committer that pushes to the branch's upstream.
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self {
            vcs,
            push: true,
            remote: None,
        }
    }

    /// Creates a committer using the push settings of a sync configuration.
    pub fn from_config(vcs: Arc<dyn VersionControl>, config: &SyncConfig) -> Self {
        Self {
            vcs,
            push: config.push,
            remote: config.remote.clone(),
        }
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

    /// Stages all changes, commits them with `message` and pushes.
    ///
    /// # Errors
    /// Returns the first failing step's error
    pub async fn commit(&self, message: &str) -> Result<()> {
        tracing::info!("Committing snapshot '{}'", message);

        self.vcs.stage_all().await?;
        self.vcs.commit(message).await?;

        if self.push {
            self.vcs
                .push(self.remote.as_deref())
                .await
                .map_err(|e| {
                    tracing::error!("Push failed, the local commit is kept: {}", e);
                    e
                })?;
            tracing::info!("Pushed snapshot commit");
        } else {
            tracing::debug!("Push disabled, commit kept local");
        }

        Ok(())
    }
}
