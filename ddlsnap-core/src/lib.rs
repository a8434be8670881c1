//! Core library for ddlsnap.
//!
//! ddlsnap mirrors the definitions of changed Oracle schema objects into a
//! git working tree, one `.sql` file per object, and reconstructs a
//! changelog from that repository's history.
//!
//! # Security Guarantees
//! - No credentials stored or logged in any data structures
//! - All database operations are read-only; no DDL is ever executed
//! - git is invoked directly, never through a shell
//!
//! # Architecture
//! - `catalog`: session traits and the Oracle backend
//! - `snapshot`: deterministic object-to-file mapping and writes
//! - `sync`: orchestration of listing, extraction, writes and the commit
//! - `cutoff`: watermark recovery from commit messages
//! - `vcs`: version-control interface, git adapter and committer
//! - `changelog`: history walk with tag correlation and tree diffs

pub mod catalog;
pub mod changelog;
pub mod config;
pub mod cutoff;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod security;
pub mod snapshot;
pub mod sync;
pub mod vcs;

// Re-export commonly used types
pub use catalog::{CatalogConnector, CatalogSession, create_connector};
pub use changelog::{Changelog, ChangelogBuilder};
pub use config::{ChangelogConfig, ConnectionConfig, SyncConfig};
pub use cutoff::CutoffResolver;
pub use error::{DdlSnapError, Result};
pub use models::{CatalogObject, CommitRecord, Extraction, SchemaAllowlist, TagRecord};
pub use output::{BufferSink, OutputSink, StdoutSink};
pub use snapshot::SnapshotWriter;
pub use sync::{AbortHandle, SyncOrchestrator, SyncReport};
pub use vcs::{Committer, GitCli, VersionControl};
