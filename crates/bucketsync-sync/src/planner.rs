//! Diff engine
//!
//! Classifies every path of a local and a remote listing into the lists of
//! a [`SyncPlan`]. Local content always wins: a path present locally is
//! uploaded or left alone, never downloaded.
//!
//! ## Classification
//!
//! | local | remote              | outcome                                   |
//! |-------|---------------------|-------------------------------------------|
//! | yes   | absent              | upload                                    |
//! | yes   | checksum differs    | upload                                    |
//! | yes   | checksum equal      | unchanged                                 |
//! | no    | outside scope       | ignored                                   |
//! | no    | `delete_orphaned`   | delete                                    |
//! | no    | otherwise           | download                                  |
//!
//! Protection is decided separately for every in-scope remote-only path:
//! a protected path is counted in `protected_skipped` and never downloaded,
//! whether or not it is also deleted.

use bucketsync_core::domain::{
    FileDigestMap, ProtectedPaths, RemoteFileMap, ScopePaths, SyncPlan,
};
use tracing::debug;

/// Build the plan for one sync run.
pub fn plan(
    local: &FileDigestMap,
    remote: &RemoteFileMap,
    scope: Option<&ScopePaths>,
    delete_orphaned: bool,
    protected: &ProtectedPaths,
) -> SyncPlan {
    let mut plan = SyncPlan::default();

    for (path, digest) in local {
        match remote.get(path) {
            None => {
                debug!(path = %path, "New file to upload");
                plan.to_upload.push(path.clone());
            }
            Some(record) if !record.checksum_matches(digest) => {
                debug!(path = %path, "Modified file to upload");
                plan.to_upload.push(path.clone());
            }
            Some(_) => plan.unchanged += 1,
        }
    }

    for path in remote.keys().filter(|path| !local.contains_key(*path)) {
        if let Some(scope) = scope {
            if !scope.contains(path) {
                continue;
            }
        }

        let is_protected = protected.protects(path);
        if is_protected {
            debug!(path = %path, "Skipping write-protected file");
            plan.protected_skipped += 1;
        }

        if delete_orphaned {
            debug!(path = %path, "Orphaned file to delete");
            plan.to_delete.push(path.clone());
        } else if !is_protected {
            debug!(path = %path, "New file to download");
            plan.to_download.push(path.clone());
        }
    }

    plan
}
