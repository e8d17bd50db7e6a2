//! Sync engine
//!
//! The [`SyncEngine`] runs one synchronization of a local directory against
//! a storage backend.
//!
//! ## Sync Flow
//!
//! 1. **Validate**: the local root must be an existing directory
//! 2. **Scan**: digest local files (blocking, off the async runtime)
//! 3. **List**: fetch the remote listing; a failure aborts the run
//! 4. **Filter**: apply include/exclude patterns to both listings
//! 5. **Plan**: classify paths into upload/download/delete lists
//! 6. **Execute**: run the plan (or report it, in dry-run mode)

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bucketsync_core::domain::{ChecksumAlgorithm, ProtectedPaths, ScopePaths, SyncResult};
use bucketsync_core::ports::{IStorageBackend, ProgressCallback};
use tracing::{info, instrument};

use crate::filter::PathFilter;
use crate::scanner::LocalTreeScanner;
use crate::{executor, planner, SyncError};

const DEFAULT_MAX_WORKERS: usize = 4;

/// Fully resolved parameters of one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub max_workers: usize,
    pub delete_orphaned: bool,
    pub include_pattern: Option<String>,
    pub exclude_pattern: Option<String>,
    pub dry_run: bool,
    /// Sub-paths to restrict the run to. Non-empty paths also become
    /// download-protected.
    pub sync_paths: Vec<String>,
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            delete_orphaned: false,
            include_pattern: None,
            exclude_pattern: None,
            dry_run: false,
            sync_paths: Vec::new(),
        }
    }
}

/// Scans, diffs and executes against one backend.
pub struct SyncEngine {
    backend: Arc<dyn IStorageBackend>,
    scanner: LocalTreeScanner,
}

impl SyncEngine {
    pub fn new(backend: Arc<dyn IStorageBackend>, algorithm: ChecksumAlgorithm) -> Self {
        Self {
            backend,
            scanner: LocalTreeScanner::new(algorithm),
        }
    }

    pub fn backend(&self) -> &Arc<dyn IStorageBackend> {
        &self.backend
    }

    /// Synchronize `root` with the backend's bucket.
    ///
    /// Per-item transfer failures are reported in the returned
    /// [`SyncResult`]; only problems that prevent a plan from being built
    /// are returned as `Err`.
    #[instrument(
        skip(self, request, progress),
        fields(root = %root.display(), provider = self.backend.provider_name())
    )]
    pub async fn sync(
        &self,
        root: &Path,
        request: &SyncRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<SyncResult, SyncError> {
        let started = Instant::now();

        if !root.is_dir() {
            return Err(SyncError::PathNotFound(root.to_path_buf()));
        }

        let filter = PathFilter::new(
            request.include_pattern.as_deref(),
            request.exclude_pattern.as_deref(),
        )?;
        let scope = ScopePaths::from_paths(&request.sync_paths);
        let protected = if scope.is_some() {
            ProtectedPaths::new(root, &request.sync_paths)
        } else {
            ProtectedPaths::none()
        };

        let scanner = self.scanner;
        let scan_root = root.to_path_buf();
        let scan_scope = scope.clone();
        let mut local =
            tokio::task::spawn_blocking(move || scanner.scan(&scan_root, scan_scope.as_ref()))
                .await?;

        info!("Scanning remote storage");
        let mut remote = self
            .backend
            .list_remote_files(None)
            .await
            .map_err(|e| SyncError::RemoteListing(format!("{e:#}")))?;

        filter.retain(&mut local);
        filter.retain(&mut remote);

        let plan = planner::plan(
            &local,
            &remote,
            scope.as_ref(),
            request.delete_orphaned,
            &protected,
        );
        info!(
            local = local.len(),
            remote = remote.len(),
            upload = plan.to_upload.len(),
            download = plan.to_download.len(),
            delete = plan.to_delete.len(),
            unchanged = plan.unchanged,
            protected_skipped = plan.protected_skipped,
            "Sync plan ready"
        );

        let result = executor::execute(
            &plan,
            self.backend.as_ref(),
            root,
            request.max_workers,
            request.dry_run,
            progress.as_ref(),
        )
        .await;

        info!(
            uploaded = result.uploaded,
            downloaded = result.downloaded,
            deleted = result.deleted,
            failed = result.failed,
            duration_ms = started.elapsed().as_millis() as u64,
            "{}",
            result
        );
        Ok(result)
    }
}
