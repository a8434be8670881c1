//! Changelog reconstruction from the snapshot repository's history.
//!
//! The newest commits are listed newest first and correlated with tags. Two
//! anchors are tracked while walking: `head`, the first commit seen, and
//! `tagged`, the first tagged commit that is not `head`. Once both are known
//! the paths that differ between their trees are computed once and rendered
//! right after the entry that fixed the anchors.
//!
//! The walk is bounded by the lookback window, so it always terminates.

use crate::{
    Result,
    config::ChangelogConfig,
    error::DdlSnapError,
    models::{CommitRecord, short_id},
    output::OutputSink,
    vcs::VersionControl,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// `Date:` line format, e.g. `Wed 01 May 10:00:00 2024 +02:00`.
pub const CHANGELOG_DATE_FORMAT: &str = "%a %d %b %H:%M:%S %Y %:z";

/// One commit in the changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogEntry {
    /// The commit
    pub commit: CommitRecord,
    /// Names of tags pointing exactly at this commit, sorted
    pub tags: Vec<String>,
}

/// Paths changed between the newest commit and the newest tagged commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeChanges {
    /// Tag naming the tagged anchor (first in sort order when several)
    pub tag: String,
    /// Newest commit
    pub head_id: String,
    /// Newest tagged commit other than the newest commit
    pub tagged_id: String,
    /// Changed paths; renames appear as a deletion plus an addition
    pub paths: Vec<String>,
}

/// A built changelog, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Changelog {
    /// Entries, newest first
    pub entries: Vec<ChangelogEntry>,
    /// Tree diff between the anchors, when both exist
    pub changes: Option<TreeChanges>,
    /// Entry after which `changes` is rendered
    #[serde(skip)]
    anchor_index: Option<usize>,
}

impl Changelog {
    /// Id of the newest commit.
    pub fn head(&self) -> Option<&str> {
        self.entries.first().map(|entry| entry.commit.id.as_str())
    }

    /// Id of the newest tagged commit that is not the newest commit.
    pub fn tagged(&self) -> Option<&str> {
        self.anchor_index
            .and_then(|i| self.entries.get(i))
            .map(|entry| entry.commit.id.as_str())
    }

    /// Renders the changelog as text lines.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for (index, entry) in self.entries.iter().enumerate() {
            render_entry(entry, &mut lines);

            if self.anchor_index == Some(index)
                && let Some(changes) = &self.changes
            {
                lines.push(format!(
                    "Changes since {} ({}):",
                    changes.tag,
                    short_id(&changes.tagged_id)
                ));
                lines.extend(changes.paths.iter().cloned());
                lines.push(String::new());
            }
        }

        lines
    }

    /// Appends the rendered changelog to an output sink.
    pub fn write_to(&self, sink: &dyn OutputSink) {
        for line in self.render() {
            sink.line(&line);
        }
    }

    /// Serializes the changelog as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DdlSnapError::Serialization {
            context: "Failed to serialize changelog".to_string(),
            source: e,
        })
    }
}

fn render_entry(entry: &ChangelogEntry, lines: &mut Vec<String>) {
    let commit = &entry.commit;

    lines.push(format!("commit {}", commit.id));
    if commit.is_merge() {
        let parents: Vec<&str> = commit.parent_ids.iter().map(|p| short_id(p)).collect();
        lines.push(format!("Merge: {}", parents.join(" ")));
    }
    lines.push(format!(
        "Author: {} <{}>",
        commit.author_name, commit.author_email
    ));
    lines.push(format!(
        "Date:   {}",
        commit.author_time.format(CHANGELOG_DATE_FORMAT)
    ));
    lines.extend(entry.tags.iter().cloned());
    lines.push(String::new());
    lines.extend(commit.message.trim_end().lines().map(str::to_string));
    lines.push(String::new());
}

/// Builds changelogs from a repository.
pub struct ChangelogBuilder {
    vcs: Arc<dyn VersionControl>,
    config: ChangelogConfig,
}

impl ChangelogBuilder {
    /// Creates a builder over the given repository.
    pub fn new(vcs: Arc<dyn VersionControl>, config: ChangelogConfig) -> Self {
        Self { vcs, config }
    }

    /// Reads history and tags and assembles the changelog.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or history cannot be read
    pub async fn build(&self) -> Result<Changelog> {
        self.config.validate()?;

        let commits = self.vcs.list_commits(self.config.lookback).await?;
        let tags = self.vcs.list_tags().await?;
        tracing::debug!(
            "Building changelog from {} commit(s), {} tag(s)",
            commits.len(),
            tags.len()
        );

        let mut tags_by_target: HashMap<String, Vec<String>> = HashMap::new();
        for tag in tags {
            tags_by_target
                .entry(tag.target_id)
                .or_default()
                .push(tag.name);
        }

        let mut entries = Vec::with_capacity(commits.len());
        let mut anchor_index = None;

        for (index, commit) in commits.into_iter().enumerate() {
            let mut entry_tags = tags_by_target.remove(&commit.id).unwrap_or_default();
            entry_tags.sort();

            if index > 0 && anchor_index.is_none() && !entry_tags.is_empty() {
                anchor_index = Some(index);
            }

            entries.push(ChangelogEntry {
                commit,
                tags: entry_tags,
            });
        }

        let changes = match anchor_index.and_then(|i| entries.get(i)) {
            Some(tagged) => {
                let head = &entries[0].commit;
                let paths = self.vcs.diff_paths(&tagged.commit.id, &head.id).await?;
                tracing::debug!(
                    "{} path(s) changed since {}",
                    paths.len(),
                    tagged.commit.short_id()
                );
                Some(TreeChanges {
                    tag: tagged.tags.first().cloned().unwrap_or_default(),
                    head_id: head.id.clone(),
                    tagged_id: tagged.commit.id.clone(),
                    paths,
                })
            }
            None => None,
        };

        Ok(Changelog {
            entries,
            changes,
            anchor_index,
        })
    }
}
