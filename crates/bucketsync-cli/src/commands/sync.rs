//! Sync command - Synchronize the local directory with the bucket
//!
//! Loads the configuration, connects to the provider, runs the sync engine
//! and prints per-file progress followed by a summary. A run with any
//! failed operation exits with status 1.

use std::sync::Arc;

use anyhow::Result;
use bucketsync_core::domain::SyncAction;
use bucketsync_core::ports::ProgressCallback;
use bucketsync_sync::SyncOptions;
use clap::Args;
use tracing::info;

use super::{after_close, CliContext};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Limit the sync to these paths (relative to the directory)
    #[arg(long, num_args = 1..)]
    pub paths: Vec<String>,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Delete remote files that do not exist locally
    #[arg(long, conflicts_with = "no_delete_orphaned")]
    pub delete_orphaned: bool,

    /// Keep remote files that do not exist locally
    #[arg(long)]
    pub no_delete_orphaned: bool,

    /// Maximum number of concurrent transfers
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Only sync paths matching this regular expression
    #[arg(long)]
    pub include: Option<String>,

    /// Skip paths matching this regular expression
    #[arg(long)]
    pub exclude: Option<String>,
}

impl SyncCommand {
    /// Overrides passed to the engine; unset flags fall back to the configuration.
    pub fn options(&self) -> SyncOptions {
        let delete_orphaned = match (self.delete_orphaned, self.no_delete_orphaned) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        };
        SyncOptions {
            max_workers: self.max_workers,
            delete_orphaned,
            include_pattern: self.include.clone(),
            exclude_pattern: self.exclude.clone(),
            dry_run: self.dry_run,
            sync_paths: (!self.paths.is_empty()).then(|| self.paths.clone()),
        }
    }

    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let client = ctx.connect().await?;

        info!(
            directory = %ctx.directory.display(),
            provider = %client.config().provider,
            bucket = %client.config().bucket_name,
            "Starting sync"
        );
        if self.dry_run {
            formatter.info("Dry run mode - no changes will be made");
        }

        let progress = (!ctx.quiet && !ctx.is_json()).then(progress_printer);
        let result = client.sync(&ctx.directory, &self.options(), progress).await;
        let result = after_close(result, client.close().await)?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&result)?);
        } else {
            for error in &result.errors {
                formatter.warn(error);
            }
            if result.success {
                formatter.success(&result.to_string());
            }
        }

        if !result.success {
            anyhow::bail!("{result}");
        }
        Ok(())
    }
}

/// Progress line: `Uploading: 3/10 (30%) - docs/a.txt`.
pub fn progress_line(current: usize, total: usize, action: SyncAction, path: &str) -> String {
    let percent = if total == 0 { 100 } else { current * 100 / total };
    let label = action.progress_label();
    let mut chars = label.chars();
    let label = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{label}: {current}/{total} ({percent}%) - {path}")
}

fn progress_printer() -> ProgressCallback {
    Arc::new(|current: usize, total: usize, action: SyncAction, path: &str| {
        println!("{}", progress_line(current, total, action, path));
    })
}
