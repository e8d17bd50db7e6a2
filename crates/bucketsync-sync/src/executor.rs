//! Execution engine
//!
//! Runs a [`SyncPlan`] against a storage backend. Uploads, downloads and
//! deletions are processed as three consecutive phases; within a phase at
//! most `max_workers` operations are in flight at once.
//!
//! ## Design Notes
//!
//! - Each phase yields one outcome per path, in list order, and outcomes
//!   are folded into the [`SyncResult`] only after the phase drains. No
//!   counter is shared between in-flight operations.
//! - A failing item never aborts the run: `Ok(false)` from the backend is
//!   recorded as "Failed to <verb>: <path>", an `Err` as
//!   "Error <verb>ing <path>: <message>".
//! - The progress callback fires as each operation is started.

use std::path::Path;

use bucketsync_core::domain::{SyncAction, SyncPlan, SyncResult};
use bucketsync_core::ports::{IStorageBackend, ProgressCallback};
use futures_util::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

/// Result of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Done,
    Refused,
    Failed(String),
}

/// Execute `plan` against `backend`, with files resolved under `root`.
///
/// In dry-run mode no backend call is made and the counters are taken
/// straight from the plan.
#[instrument(skip_all, fields(root = %root.display(), max_workers, dry_run))]
pub async fn execute(
    plan: &SyncPlan,
    backend: &dyn IStorageBackend,
    root: &Path,
    max_workers: usize,
    dry_run: bool,
    progress: Option<&ProgressCallback>,
) -> SyncResult {
    if dry_run {
        let result = SyncResult::dry_run(plan);
        info!("DRY RUN: Would upload {} files", result.uploaded);
        info!("DRY RUN: Would download {} files", result.downloaded);
        info!("DRY RUN: Would delete {} files", result.deleted);
        info!("DRY RUN: Would leave {} files unchanged", result.unchanged);
        info!(
            "DRY RUN: Would skip {} write-protected files",
            result.protected_skipped
        );
        return result;
    }

    let workers = max_workers.max(1);
    let mut result = SyncResult {
        unchanged: plan.unchanged,
        protected_skipped: plan.protected_skipped,
        ..SyncResult::default()
    };

    for action in [SyncAction::Upload, SyncAction::Download, SyncAction::Delete] {
        let paths = plan.paths_for(action);
        if paths.is_empty() {
            continue;
        }
        info!(action = %action, files = paths.len(), "Processing phase");
        let outcomes = run_phase(backend, root, action, paths, workers, progress).await;
        merge(&mut result, action, paths, outcomes);
    }

    result.finalize();
    result
}

async fn run_phase(
    backend: &dyn IStorageBackend,
    root: &Path,
    action: SyncAction,
    paths: &[String],
    workers: usize,
    progress: Option<&ProgressCallback>,
) -> Vec<Outcome> {
    let total = paths.len();
    stream::iter(paths.iter().enumerate())
        .map(|(i, path)| {
            if let Some(callback) = progress {
                callback(i + 1, total, action, path);
            }
            run_one(backend, root, action, path)
        })
        .buffered(workers)
        .collect()
        .await
}

async fn run_one(
    backend: &dyn IStorageBackend,
    root: &Path,
    action: SyncAction,
    path: &str,
) -> Outcome {
    let local_path = root.join(path);
    let response = match action {
        SyncAction::Upload => backend.upload_file(&local_path, path).await,
        SyncAction::Download => {
            if let Some(parent) = local_path.parent() {
                // create_dir_all succeeds when another download created it first
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return Outcome::Failed(format!(
                        "cannot create directory {}: {e}",
                        parent.display()
                    ));
                }
            }
            backend.download_file(path, &local_path).await
        }
        SyncAction::Delete => backend.delete_file(path).await,
    };

    match response {
        Ok(true) => Outcome::Done,
        Ok(false) => Outcome::Refused,
        Err(e) => Outcome::Failed(format!("{e:#}")),
    }
}

fn merge(result: &mut SyncResult, action: SyncAction, paths: &[String], outcomes: Vec<Outcome>) {
    for (path, outcome) in paths.iter().zip(outcomes) {
        match outcome {
            Outcome::Done => match action {
                SyncAction::Upload => result.uploaded += 1,
                SyncAction::Download => result.downloaded += 1,
                SyncAction::Delete => result.deleted += 1,
            },
            Outcome::Refused => {
                let msg = format!("Failed to {}: {}", action.verb(), path);
                warn!(%msg);
                result.record_failure(msg);
            }
            Outcome::Failed(e) => {
                let msg = format!("Error {} {}: {}", action.progress_label(), path, e);
                warn!(%msg);
                result.record_failure(msg);
            }
        }
    }
}
