//! Local tree scanner
//!
//! Produces a [`FileDigestMap`] for a local root, either for the whole tree
//! or for a set of scope paths relative to it.
//!
//! ## Design Notes
//!
//! - Symlinked directories are never descended into, so a link cycle cannot
//!   make the walk loop. A symlink that resolves to a regular file is hashed
//!   through the link; a dangling link is skipped with a warning.
//! - Walk errors on single entries (permission denied on a subdirectory)
//!   are logged and skipped; they never abort the scan.
//! - Scanning is blocking work; async callers run it under `spawn_blocking`.
//! - Leftover partial downloads (`*.bucketsync-part`) are never listed.

use std::path::Path;

use bucketsync_core::domain::{
    ChecksumAlgorithm, FileDigestMap, ScopePaths, PARTIAL_DOWNLOAD_SUFFIX,
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::checksum;

/// Walks a local tree and digests every regular file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTreeScanner {
    algorithm: ChecksumAlgorithm,
}

impl LocalTreeScanner {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Scan `root`, restricted to `scope` when given.
    pub fn scan(&self, root: &Path, scope: Option<&ScopePaths>) -> FileDigestMap {
        let mut files = FileDigestMap::new();
        match scope {
            None => {
                info!(root = %root.display(), "Scanning local directory");
                self.walk_into(root, root, &mut files);
            }
            Some(scope) => {
                info!(
                    root = %root.display(),
                    paths = scope.entries().len(),
                    "Scanning local directory limited to sync paths"
                );
                for entry in scope.entries() {
                    let target = root.join(entry);
                    if target.is_file() {
                        self.add_file(root, &target, &mut files);
                    } else if target.is_dir() {
                        self.walk_into(root, &target, &mut files);
                    } else {
                        warn!(path = %target.display(), "Sync path not found");
                    }
                }
            }
        }
        debug!(files = files.len(), "Local scan complete");
        files
    }

    fn walk_into(&self, root: &Path, dir: &Path, files: &mut FileDigestMap) {
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_file() {
                self.add_file(root, entry.path(), files);
            } else if file_type.is_symlink() {
                match std::fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_file() => self.add_file(root, entry.path(), files),
                    Ok(_) => {
                        debug!(path = %entry.path().display(), "Not following directory symlink");
                    }
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "Skipping dangling symlink");
                    }
                }
            }
        }
    }

    fn add_file(&self, root: &Path, path: &Path, files: &mut FileDigestMap) {
        let Some(relative) = relative_key(root, path) else {
            warn!(path = %path.display(), "File outside sync root, skipping");
            return;
        };
        if relative.ends_with(PARTIAL_DOWNLOAD_SUFFIX) {
            debug!(path = %relative, "Skipping partial download");
            return;
        }
        let digest = checksum::digest(path, self.algorithm);
        files.insert(relative, digest);
    }
}

/// Root-relative key with forward slashes.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
