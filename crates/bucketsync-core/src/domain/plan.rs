//! Sync plans

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three transfer actions a plan can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Upload,
    Download,
    Delete,
}

impl SyncAction {
    /// Name passed to progress callbacks.
    pub fn progress_label(&self) -> &'static str {
        match self {
            Self::Upload => "uploading",
            Self::Download => "downloading",
            Self::Delete => "deleting",
        }
    }

    /// Infinitive used in "Failed to ..." messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.progress_label())
    }
}

/// What a sync run intends to do, derived from a local and a remote listing.
///
/// The three lists are disjoint: a path is uploaded because it exists
/// locally, downloaded or deleted only because it does not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub to_upload: Vec<String>,
    pub to_download: Vec<String>,
    pub to_delete: Vec<String>,
    /// Local files whose digest matches the remote checksum
    pub unchanged: usize,
    /// Remote-only files that would have landed under a protected path
    pub protected_skipped: usize,
}

impl SyncPlan {
    /// Paths scheduled for a given action.
    pub fn paths_for(&self, action: SyncAction) -> &[String] {
        match action {
            SyncAction::Upload => &self.to_upload,
            SyncAction::Download => &self.to_download,
            SyncAction::Delete => &self.to_delete,
        }
    }

    /// Total number of transfer operations in the plan.
    pub fn operation_count(&self) -> usize {
        self.to_upload.len() + self.to_download.len() + self.to_delete.len()
    }

    pub fn is_noop(&self) -> bool {
        self.operation_count() == 0
    }
}
