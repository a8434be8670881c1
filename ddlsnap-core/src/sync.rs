//! Sync orchestration: list changed objects, extract, write, commit.
//!
//! One run is `list → (extract → save)* → commit`. The commit happens after
//! every worker has finished and is made even when nothing changed, so the
//! watermark in the log advances on every completed run.
//!
//! # Concurrency
//! With a concurrency of 1 the listing session is reused for every
//! extraction, in listing order. With `n > 1`, `n` workers pull from a shared
//! queue; the listing session becomes the first worker's session and every
//! other worker opens its own. A session is never used by two workers.
//!
//! # Failure and abort
//! `Skipped` and `Undefined` extractions are reported and the run continues.
//! Any other error stops every worker and the run returns it without
//! committing. An abort requested through [`AbortHandle`] stops new
//! extractions; in-flight ones complete and what was written is committed.
//! An aborted run records the cutoff it started from, not its own watermark,
//! so objects it never reached are listed again by the next run.

use crate::{
    Result,
    catalog::{CatalogConnector, CatalogSession},
    config::SyncConfig,
    error::DdlSnapError,
    models::{CatalogObject, Extraction, format_watermark, truncate_to_seconds},
    output::OutputSink,
    snapshot::SnapshotWriter,
    vcs::Committer,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Suffix of the commit message recorded by an aborted run.
pub const INTERRUPTED_SUFFIX: &str = " (interrupted)";

/// Outcome of a completed sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Cutoff the catalog was queried with
    pub cutoff: NaiveDateTime,
    /// Watermark recorded in the commit message; the cutoff when aborted
    pub watermark: NaiveDateTime,
    /// Objects the catalog reported as changed
    pub listed: usize,
    /// Listed objects whose type is tracked
    pub tracked: usize,
    /// Snapshot files written
    pub written: usize,
    /// Objects that disappeared before extraction
    pub skipped: usize,
    /// Objects whose definition came back NULL
    pub undefined: usize,
    /// Whether the run was cut short by an abort request
    pub aborted: bool,
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} listed, {} tracked, {} written, {} not found, {} undefined{}",
            self.listed,
            self.tracked,
            self.written,
            self.skipped,
            self.undefined,
            if self.aborted { " (aborted)" } else { "" }
        )
    }
}

/// Requests that a running sync stop issuing new extractions.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    /// Requests the abort. Idempotent.
    pub fn abort(&self) {
        if !self.token.is_cancelled() {
            tracing::warn!("Abort requested, finishing in-flight extractions");
        }
        self.token.cancel();
    }

    /// Whether an abort has been requested.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct Counters {
    written: AtomicUsize,
    skipped: AtomicUsize,
    undefined: AtomicUsize,
}

/// State shared by extraction workers.
#[derive(Clone)]
struct WorkerContext {
    queue: Arc<Mutex<VecDeque<CatalogObject>>>,
    writer: Arc<SnapshotWriter>,
    sink: Arc<dyn OutputSink>,
    counters: Arc<Counters>,
    halt: CancellationToken,
}

impl WorkerContext {
    fn next_object(&self) -> Option<CatalogObject> {
        match self.queue.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}

async fn extraction_worker(
    mut session: Box<dyn CatalogSession>,
    ctx: WorkerContext,
) -> Result<()> {
    while !ctx.halt.is_cancelled() {
        let Some(object) = ctx.next_object() else {
            break;
        };

        tracing::debug!("Extracting {}", object);
        match session.extract_ddl(&object).await? {
            Extraction::Extracted(ddl) => {
                ctx.writer.save(&object, Some(&ddl)).await?;
                ctx.counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Extraction::Skipped => {
                ctx.sink.line(&format!("{} not found", object));
                tracing::warn!("{} not found, skipped", object);
                ctx.counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Extraction::Undefined => {
                tracing::warn!("Definition of {} returned NULL, nothing written", object);
                ctx.counters.undefined.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
    Ok(())
}

/// Drives one synchronization run.
pub struct SyncOrchestrator {
    connector: Arc<dyn CatalogConnector>,
    writer: Arc<SnapshotWriter>,
    committer: Committer,
    sink: Arc<dyn OutputSink>,
    config: SyncConfig,
    abort: CancellationToken,
}

impl SyncOrchestrator {
    /// Creates an orchestrator; the snapshot root is taken from `config`.
    pub fn new(
        connector: Arc<dyn CatalogConnector>,
        committer: Committer,
        sink: Arc<dyn OutputSink>,
        config: SyncConfig,
    ) -> Self {
        Self {
            connector,
            writer: Arc::new(SnapshotWriter::new(config.root.clone())),
            committer,
            sink,
            config,
            abort: CancellationToken::new(),
        }
    }

    /// Handle for requesting an abort from another task, e.g. a signal handler.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            token: self.abort.clone(),
        }
    }

    /// Runs a sync for objects changed strictly after `cutoff`.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid, the catalog cannot be
    /// listed, an extraction or write fails, or the commit fails
    pub async fn run(&self, cutoff: NaiveDateTime) -> Result<SyncReport> {
        self.config.validate()?;

        let watermark = truncate_to_seconds(chrono::Local::now().naive_local());
        tracing::info!(
            "Syncing {} into {} (cutoff {}, watermark {})",
            self.connector.safe_description(),
            self.config.root.display(),
            cutoff,
            watermark
        );

        let mut session = self.connector.connect().await?;
        let listed = session
            .list_changed_objects(cutoff, &self.config.schemas)
            .await?;
        let listed_count = listed.len();

        let queue: VecDeque<CatalogObject> = listed
            .into_iter()
            .filter(|object| {
                let tracked = object.is_tracked();
                if !tracked {
                    tracing::debug!("Ignoring untracked {}", object);
                }
                tracked
            })
            .collect();
        let tracked_count = queue.len();
        tracing::info!(
            "{} changed object(s), {} tracked",
            listed_count,
            tracked_count
        );

        let counters = Arc::new(Counters::default());
        let ctx = WorkerContext {
            queue: Arc::new(Mutex::new(queue)),
            writer: Arc::clone(&self.writer),
            sink: Arc::clone(&self.sink),
            counters: Arc::clone(&counters),
            halt: self.abort.child_token(),
        };

        self.extract_all(session, ctx, tracked_count).await?;

        let aborted = self.abort.is_cancelled();
        let (recorded, message) = if aborted {
            tracing::warn!(
                "Sync aborted, committing what was written and keeping cutoff {}",
                format_watermark(cutoff)
            );
            (
                cutoff,
                format!("{}{}", format_watermark(cutoff), INTERRUPTED_SUFFIX),
            )
        } else {
            (watermark, format_watermark(watermark))
        };

        let report = SyncReport {
            cutoff,
            watermark: recorded,
            listed: listed_count,
            tracked: tracked_count,
            written: counters.written.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            undefined: counters.undefined.load(Ordering::Relaxed),
            aborted,
        };

        self.committer.commit(&message).await?;
        tracing::info!("Sync complete: {}", report);
        Ok(report)
    }

    async fn extract_all(
        &self,
        session: Box<dyn CatalogSession>,
        ctx: WorkerContext,
        tracked_count: usize,
    ) -> Result<()> {
        let workers = self.config.concurrency.min(tracked_count);
        if workers == 0 {
            return Ok(());
        }

        let mut tasks = JoinSet::new();
        tasks.spawn(extraction_worker(session, ctx.clone()));
        for _ in 1..workers {
            let connector = Arc::clone(&self.connector);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                if ctx.halt.is_cancelled() {
                    return Ok(());
                }
                let session = connector.connect().await?;
                extraction_worker(session, ctx).await
            });
        }
        tracing::debug!("Started {} extraction worker(s)", workers);

        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| DdlSnapError::catalog_failed("Extraction worker failed", e))
                .and_then(|result| result);

            if let Err(e) = outcome {
                ctx.halt.cancel();
                if failure.is_none() {
                    tracing::error!("Sync halted: {}", e);
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let at = crate::models::sentinel_cutoff();
        let report = SyncReport {
            cutoff: at,
            watermark: at,
            listed: 4,
            tracked: 3,
            written: 1,
            skipped: 1,
            undefined: 1,
            aborted: true,
        };
        assert_eq!(
            report.to_string(),
            "4 listed, 3 tracked, 1 written, 1 not found, 1 undefined (aborted)"
        );
    }

    #[test]
    fn test_abort_handle_is_shared() {
        let token = CancellationToken::new();
        let handle = AbortHandle {
            token: token.clone(),
        };
        let other = handle.clone();
        assert!(!handle.is_aborted());
        other.abort();
        other.abort();
        assert!(handle.is_aborted());
        assert!(token.is_cancelled());
    }
}
