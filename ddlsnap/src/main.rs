//! Oracle schema snapshot tool.
//!
//! Mirrors the DDL of changed catalog objects into a git working tree and
//! renders the repository's changelog.
//!
//! # Security Guarantees
//! - Read-only database operations only
//! - No credentials stored or logged
//! - git is invoked without a shell

use anyhow::{Context, anyhow};
use clap::Parser;
use ddlsnap::{ChangelogArgs, Cli, Command, CutoffArgs, OutputFormat, SyncArgs, TestArgs};
use ddlsnap_core::{
    ChangelogBuilder, ChangelogConfig, Committer, CutoffResolver, GitCli, OutputSink, StdoutSink,
    SyncOrchestrator, VersionControl, create_connector,
    error::redact_database_url,
    logging::init_logging,
    models::{TRACKED_OBJECT_TYPES, format_watermark, sentinel_cutoff},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format)?;

    match cli.command {
        Command::Sync(args) => run_sync(args).await,
        Command::Changelog(args) => show_changelog(args).await,
        Command::Cutoff(args) => show_cutoff(args).await,
        Command::Test(args) => test_connection(args).await,
        Command::Types => {
            list_tracked_types();
            Ok(())
        }
    }
}

/// Extracts changed objects and commits them
async fn run_sync(args: SyncArgs) -> anyhow::Result<()> {
    let (database_url, source) = args.database.resolve_url().map_err(|e| anyhow!(e))?;
    debug!("Database URL loaded from {}", source);
    info!("Target: {}", redact_database_url(&database_url));

    let config = args.sync_config();
    config.validate()?;

    let connector = create_connector(&database_url, args.connection_config()).map_err(|e| {
        error!("Failed to create catalog connector: {}", e);
        e
    })?;
    drop(database_url);

    let vcs: Arc<dyn VersionControl> = Arc::new(GitCli::open(&config.root).await?);

    let cutoff = if args.full {
        info!("Full extraction requested");
        sentinel_cutoff()
    } else if let Some(since) = args.since {
        since
    } else {
        CutoffResolver::new(Arc::clone(&vcs), config.lookback)
            .resolve()
            .await
            .context("Failed to recover the previous sync time")?
    };
    info!(
        "Extracting objects changed after {}",
        format_watermark(cutoff)
    );

    let committer = Committer::from_config(vcs, &config);
    let orchestrator =
        SyncOrchestrator::new(connector, committer, Arc::new(StdoutSink), config);

    let abort = orchestrator.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    let result = orchestrator.run(cutoff).await;
    interrupt.abort();

    let report = result.context("Sync failed")?;
    if report.aborted {
        warn!(
            "Sync was interrupted; the next run starts again from {}",
            format_watermark(report.cutoff)
        );
        println!(
            "Interrupted, kept {}: {}",
            format_watermark(report.cutoff),
            report
        );
    } else {
        println!("Synced {}: {}", format_watermark(report.watermark), report);
    }

    Ok(())
}

/// Prints the changelog of the snapshot repository
async fn show_changelog(args: ChangelogArgs) -> anyhow::Result<()> {
    let vcs = Arc::new(GitCli::open(&args.repo.repo).await?);
    let changelog = ChangelogBuilder::new(
        vcs,
        ChangelogConfig {
            lookback: args.lookback,
        },
    )
    .build()
    .await
    .context("Failed to build changelog")?;

    match args.format {
        OutputFormat::Text => changelog.write_to(&StdoutSink),
        OutputFormat::Json => StdoutSink.line(&changelog.to_json()?),
    }

    Ok(())
}

/// Prints the cutoff the next sync would use
async fn show_cutoff(args: CutoffArgs) -> anyhow::Result<()> {
    let vcs = Arc::new(GitCli::open(&args.repo.repo).await?);
    let cutoff = CutoffResolver::new(vcs, args.lookback).resolve().await?;
    println!("{}", format_watermark(cutoff));
    Ok(())
}

/// Tests database connection without extracting anything
async fn test_connection(args: TestArgs) -> anyhow::Result<()> {
    info!("Testing database connection...");

    let (database_url, _source) = args.database.resolve_url().map_err(|e| anyhow!(e))?;
    let connector = create_connector(&database_url, args.database.connection_config())?;
    drop(database_url);

    let mut session = connector.connect().await?;
    session.ping().await.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;

    info!("✓ Connection test successful");
    println!("Connection to {} successful", connector.safe_description());

    Ok(())
}

/// Lists the object types whose definitions are extracted
fn list_tracked_types() {
    for object_type in TRACKED_OBJECT_TYPES {
        println!("{}", object_type);
    }
}
