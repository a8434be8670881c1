//! `git` subprocess adapter.
//!
//! Arguments are passed directly to the executable; no shell is involved, so
//! commit messages need no quoting. Machine-readable output uses the ASCII
//! unit separator between fields and NUL between records. git refuses NUL in
//! commit messages, and the message is always the last field, so any other
//! byte in a message is read back unchanged.

use super::VersionControl;
use crate::{
    Result,
    error::DdlSnapError,
    models::{CommitRecord, TagRecord},
};
use async_trait::async_trait;
use chrono::DateTime;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

const FIELD_SEP: char = '\x1f';

/// `git log` format: id, parents, author name, email, strict ISO time, raw body.
/// Used with `-z`, which terminates each record with NUL.
const LOG_FORMAT: &str = "--format=%H%x1f%P%x1f%an%x1f%ae%x1f%aI%x1f%B";

const LOG_ARGS: &[&str] = &["log", "-z", "--no-show-signature", LOG_FORMAT];

/// `git for-each-ref` format: full ref name, object id, peeled object id.
const TAG_FORMAT: &str = "--format=%(refname)%1f%(objectname)%1f%(*objectname)";

const TAG_PREFIX: &str = "refs/tags/";

/// A working tree driven through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    git: PathBuf,
    workdir: PathBuf,
}

impl GitCli {
    /// Opens the repository whose working tree contains `workdir`.
    ///
    /// # Errors
    /// Returns error if `git` is not on PATH or `workdir` is not inside a
    /// working tree
    pub async fn open(workdir: impl Into<PathBuf>) -> Result<Self> {
        let git = which::which("git").map_err(|e| {
            DdlSnapError::configuration(format!("git executable not found on PATH: {}", e))
        })?;
        let cli = Self {
            git,
            workdir: workdir.into(),
        };

        let output = cli.output(&["rev-parse", "--is-inside-work-tree"]).await?;
        if !output.status.success() {
            return Err(DdlSnapError::version_control(
                format!("{} is not a git working tree", cli.workdir.display()),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        tracing::debug!(
            "Using git at {} for {}",
            cli.git.display(),
            cli.workdir.display()
        );
        Ok(cli)
    }

    /// Working tree this adapter operates on.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn output(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.git)
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DdlSnapError::io("Failed to run", &self.git, e))
    }

    /// Runs git and returns stdout, failing on a non-zero exit.
    async fn run(&self, args: &[&str]) -> Result<String> {
        tracing::trace!("git {}", args.join(" "));
        let output = self.output(args).await?;

        if !output.status.success() {
            return Err(DdlSnapError::version_control(
                format!("git {} exited with {}", args.join(" "), output.status),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn has_head(&self) -> Result<bool> {
        let output = self.output(&["rev-parse", "--verify", "-q", "HEAD"]).await?;
        Ok(output.status.success())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn stage_all(&self) -> Result<()> {
        self.run(&["add", "-A"]).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "--quiet", "--allow-empty", "-m", message])
            .await?;
        Ok(())
    }

    async fn push(&self, remote: Option<&str>) -> Result<()> {
        match remote {
            Some(remote) => self.run(&["push", "--quiet", remote, "HEAD"]).await?,
            None => self.run(&["push", "--quiet"]).await?,
        };
        Ok(())
    }

    async fn list_commits(&self, limit: usize) -> Result<Vec<CommitRecord>> {
        if limit == 0 || !self.has_head().await? {
            return Ok(Vec::new());
        }

        let count = format!("--max-count={}", limit);
        let mut args = LOG_ARGS.to_vec();
        args.extend([count.as_str(), "HEAD"]);
        let stdout = self.run(&args).await?;
        parse_log(&stdout)
    }

    async fn list_tags(&self) -> Result<Vec<TagRecord>> {
        let stdout = self.run(&["for-each-ref", TAG_FORMAT, "refs/tags"]).await?;
        parse_tags(&stdout)
    }

    async fn diff_paths(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let stdout = self
            .run(&["diff-tree", "-r", "-z", "--name-only", "--no-renames", from, to])
            .await?;
        Ok(parse_nul_list(&stdout))
    }
}

/// Parses `git log` output produced with [`LOG_FORMAT`].
fn parse_log(stdout: &str) -> Result<Vec<CommitRecord>> {
    stdout
        .split('\0')
        .filter(|record| !record.is_empty())
        .map(parse_commit)
        .collect()
}

fn parse_commit(record: &str) -> Result<CommitRecord> {
    let malformed = || {
        DdlSnapError::version_control(format!("Unexpected git log record: {:?}", record), "")
    };

    let mut fields = record.splitn(6, FIELD_SEP);
    let id = fields.next().ok_or_else(malformed)?;
    let parents = fields.next().ok_or_else(malformed)?;
    let author_name = fields.next().ok_or_else(malformed)?;
    let author_email = fields.next().ok_or_else(malformed)?;
    let author_time = fields.next().ok_or_else(malformed)?;
    let message = fields.next().ok_or_else(malformed)?;

    let author_time = DateTime::parse_from_rfc3339(author_time).map_err(|e| {
        DdlSnapError::version_control(
            format!(
                "Unreadable author time '{}' on commit {}: {}",
                author_time, id, e
            ),
            "",
        )
    })?;

    Ok(CommitRecord {
        id: id.to_string(),
        parent_ids: parents.split_whitespace().map(str::to_string).collect(),
        author_name: author_name.to_string(),
        author_email: author_email.to_string(),
        author_time,
        message: message.trim_end_matches('\n').to_string(),
    })
}

/// Parses `git for-each-ref` output produced with [`TAG_FORMAT`].
/// Annotated tags are resolved to the object they point at.
fn parse_tags(stdout: &str) -> Result<Vec<TagRecord>> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split(FIELD_SEP).collect();
            let &[refname, object, peeled] = fields.as_slice() else {
                return Err(DdlSnapError::version_control(
                    format!("Unexpected git for-each-ref line: {:?}", line),
                    "",
                ));
            };
            let target = if peeled.is_empty() { object } else { peeled };
            Ok(TagRecord {
                name: refname
                    .strip_prefix(TAG_PREFIX)
                    .unwrap_or(refname)
                    .to_string(),
                target_id: target.to_string(),
            })
        })
        .collect()
}

fn parse_nul_list(stdout: &str) -> Vec<String> {
    stdout
        .split('\0')
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}
