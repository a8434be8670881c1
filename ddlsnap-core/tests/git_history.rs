//! Tests against a real `git` executable in temporary repositories.
//!
//! Skipped when git is not installed.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use ddlsnap_core::{
    ChangelogBuilder, ChangelogConfig, Committer, CutoffResolver, GitCli, VersionControl,
    cutoff::parse_watermark, models::sentinel_cutoff,
};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

fn git_available() -> bool {
    which::which("git").is_ok()
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("git runs");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "--quiet"]);
    git(dir, &["config", "user.name", "Snapshot Bot"]);
    git(dir, &["config", "user.email", "snapshots@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "tag.gpgsign", "false"]);
}

fn commit_file(dir: &Path, relative: &str, content: &str, message: &str) -> String {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "--quiet", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

#[tokio::test]
async fn test_git_open_rejects_non_repository() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let err = GitCli::open(dir.path()).await.unwrap_err();
    assert!(err.to_string().contains("not a git working tree"));
}

#[tokio::test]
async fn test_git_empty_repository_has_no_history() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    let vcs = Arc::new(GitCli::open(dir.path()).await.unwrap());

    assert!(vcs.list_commits(15).await.unwrap().is_empty());
    assert!(vcs.list_tags().await.unwrap().is_empty());

    let cutoff = CutoffResolver::new(vcs.clone(), 15)
        .resolve()
        .await
        .unwrap();
    assert_eq!(cutoff, sentinel_cutoff());

    let changelog = ChangelogBuilder::new(vcs, ChangelogConfig::default())
        .build()
        .await
        .unwrap();
    assert!(changelog.entries.is_empty());
    assert!(changelog.render().is_empty());
}

#[tokio::test]
async fn test_git_committer_stages_everything_without_push() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    std::fs::create_dir_all(dir.path().join("HR/TABLE")).unwrap();
    let ddl = "CREATE TABLE EMPLOYEES (ID NUMBER)";
    std::fs::write(dir.path().join("HR/TABLE/EMPLOYEES.sql"), ddl).unwrap();

    let vcs = Arc::new(GitCli::open(dir.path()).await.unwrap());
    let committer = Committer::new(vcs.clone()).with_push(false);
    committer.commit("2024-05-01T10:00:00").await.unwrap();
    // Nothing changed: the commit is still recorded.
    committer.commit("2024-05-01T11:00:00").await.unwrap();

    let commits = vcs.list_commits(15).await.unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].message, "2024-05-01T11:00:00");
    assert_eq!(commits[1].message, "2024-05-01T10:00:00");
    assert_eq!(commits[0].author_name, "Snapshot Bot");
    assert_eq!(commits[0].parent_ids, vec![commits[1].id.clone()]);
    assert!(commits[1].parent_ids.is_empty());

    let tracked = git(dir.path(), &["ls-files"]);
    assert_eq!(tracked, "HR/TABLE/EMPLOYEES.sql");
    assert_eq!(git(dir.path(), &["status", "--porcelain"]), "");
}

#[tokio::test]
async fn test_git_push_without_remote_fails_after_commit() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());

    let vcs = Arc::new(GitCli::open(dir.path()).await.unwrap());
    let err = Committer::new(vcs.clone())
        .with_remote("nowhere")
        .commit("2024-05-01T10:00:00")
        .await
        .unwrap_err();

    assert!(matches!(err, ddlsnap_core::DdlSnapError::VersionControl { .. }));
    assert_eq!(vcs.list_commits(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_git_cutoff_skips_manual_commits() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    let root = dir.path();
    let (table, ddl) = ("HR/TABLE/A.sql", "CREATE TABLE A (ID NUMBER)");
    commit_file(root, table, ddl, "2024-04-30T08:00:00");
    commit_file(root, table, "CREATE TABLE A (X INT)", "2024-05-01T10:00:00");
    commit_file(root, "README.md", "Schema snapshots", "Add README");
    commit_file(root, table, "-- hand edit", "Fix A by hand\n\nSee ticket.");

    let vcs = Arc::new(GitCli::open(dir.path()).await.unwrap());
    let cutoff = CutoffResolver::new(vcs.clone(), 15)
        .resolve()
        .await
        .unwrap();
    assert_eq!(Some(cutoff), parse_watermark("2024-05-01T10:00:00"));

    let cutoff = CutoffResolver::new(vcs, 2).resolve().await.unwrap();
    assert_eq!(cutoff, sentinel_cutoff());
}

#[tokio::test]
async fn test_git_log_reads_messages_containing_separator_bytes() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    let odd = "2024-05-01T10:00:00\x1e\x1f from an old tool";
    let root = dir.path();
    commit_file(root, "HR/TABLE/A.sql", "CREATE TABLE A (ID NUMBER)", odd);
    commit_file(root, "HR/TABLE/B.sql", "CREATE TABLE B (X INT)", "\x1f\x1e");

    let vcs = Arc::new(GitCli::open(dir.path()).await.unwrap());
    let commits = vcs.list_commits(15).await.unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].message, "\x1f\x1e");
    assert_eq!(commits[1].message, odd);
    assert_eq!(commits[1].author_email, "snapshots@example.com");
    assert_eq!(commits[0].parent_ids, vec![commits[1].id.clone()]);

    let cutoff = CutoffResolver::new(vcs, 15).resolve().await.unwrap();
    assert_eq!(Some(cutoff), parse_watermark("2024-05-01T10:00:00"));
}

#[tokio::test]
async fn test_git_changelog_with_lightweight_and_annotated_tags() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());

    let table_a = "CREATE TABLE A (ID NUMBER)";
    let view = "CREATE VIEW V AS SELECT 1 FROM DUAL";
    let table_b = "CREATE TABLE B (ID NUMBER)";

    let first = commit_file(dir.path(), "HR/TABLE/A.sql", table_a, "2024-04-30T08:00:00");
    git(dir.path(), &["tag", "baseline"]);
    let second = commit_file(dir.path(), "HR/VIEW/V.sql", view, "2024-05-01T10:00:00");
    git(dir.path(), &["tag", "-a", "release-1", "-m", "Release 1"]);
    git(dir.path(), &["tag", "approved"]);
    std::fs::remove_file(dir.path().join("HR/VIEW/V.sql")).unwrap();
    let head = commit_file(dir.path(), "HR/TABLE/B.sql", table_b, "2024-05-02T10:00:00");

    let vcs = Arc::new(GitCli::open(dir.path()).await.unwrap());

    let mut tags = vcs.list_tags().await.unwrap();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    let targets: Vec<(&str, &str)> = tags
        .iter()
        .map(|t| (t.name.as_str(), t.target_id.as_str()))
        .collect();
    assert_eq!(
        targets,
        vec![
            ("approved", second.as_str()),
            ("baseline", first.as_str()),
            ("release-1", second.as_str()),
        ]
    );

    let changelog = ChangelogBuilder::new(vcs, ChangelogConfig::default())
        .build()
        .await
        .unwrap();

    assert_eq!(changelog.entries.len(), 3);
    assert_eq!(changelog.head(), Some(head.as_str()));
    assert_eq!(changelog.tagged(), Some(second.as_str()));
    assert_eq!(changelog.entries[1].tags, vec!["approved", "release-1"]);
    assert_eq!(changelog.entries[2].tags, vec!["baseline"]);

    let changes = changelog.changes.as_ref().unwrap();
    assert_eq!(changes.tag, "approved");
    assert_eq!(changes.paths, vec!["HR/TABLE/B.sql", "HR/VIEW/V.sql"]);

    let lines = changelog.render();
    assert_eq!(lines[0], format!("commit {}", head));
    assert_eq!(lines[1], "Author: Snapshot Bot <snapshots@example.com>");
    assert!(lines[2].starts_with("Date:   "));
    assert_eq!(lines[4], "2024-05-02T10:00:00");

    let marker = lines
        .iter()
        .position(|l| l.starts_with("Changes since approved ("))
        .expect("changes are rendered");
    assert_eq!(lines[marker + 1], "HR/TABLE/B.sql");
    assert_eq!(lines[marker + 2], "HR/VIEW/V.sql");
    let second_commit_line = lines
        .iter()
        .position(|l| *l == format!("commit {}", second))
        .unwrap();
    let third_commit_line = lines
        .iter()
        .position(|l| *l == format!("commit {}", first))
        .unwrap();
    assert!(second_commit_line < marker && marker < third_commit_line);
}
