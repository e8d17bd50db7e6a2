//! Sync run results

use std::fmt;

use serde::{Deserialize, Serialize};

use super::plan::SyncPlan;

/// Outcome of a sync run.
///
/// Counters only ever grow while a run executes; `success` is derived from
/// `failed` by [`SyncResult::finalize`] once every list has drained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub uploaded: usize,
    pub downloaded: usize,
    pub deleted: usize,
    pub failed: usize,
    pub unchanged: usize,
    pub protected_skipped: usize,
    /// One message per failed operation, uploads first, then downloads, then deletes
    pub errors: Vec<String>,
}

impl Default for SyncResult {
    fn default() -> Self {
        Self {
            success: true,
            uploaded: 0,
            downloaded: 0,
            deleted: 0,
            failed: 0,
            unchanged: 0,
            protected_skipped: 0,
            errors: Vec::new(),
        }
    }
}

impl SyncResult {
    /// Result of a dry run: every planned operation is reported as done.
    pub fn dry_run(plan: &SyncPlan) -> Self {
        Self {
            success: true,
            uploaded: plan.to_upload.len(),
            downloaded: plan.to_download.len(),
            deleted: plan.to_delete.len(),
            failed: 0,
            unchanged: plan.unchanged,
            protected_skipped: plan.protected_skipped,
            errors: Vec::new(),
        }
    }

    /// Record a failed operation.
    pub fn record_failure(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }

    /// Recompute `success` from the failure counter.
    pub fn finalize(&mut self) {
        self.success = self.failed == 0;
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sync completed: {} uploaded, {} downloaded, {} deleted, {} unchanged, {} protected skipped, {} failed",
            self.uploaded,
            self.downloaded,
            self.deleted,
            self.unchanged,
            self.protected_skipped,
            self.failed
        )
    }
}
