//! Storage backend port (driven/secondary port)
//!
//! This module defines the interface every remote bucket provider
//! implements. The sync engine only ever talks to a bucket through it.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Transfer primitives distinguish an expected refusal (`Ok(false)`, e.g.
//!   an HTTP 404 or 401) from an unexpected failure (`Err`). The execution
//!   engine turns both into a per-item failure with different messages.
//! - `list_remote_files` returns `Err` when the listing cannot be obtained.
//!   An empty map always means an empty bucket.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::{RemoteFileMap, SyncAction};

/// Progress callback invoked before each transfer starts:
/// `(current, total, action, relative_path)`, with `current` 1-based
/// within the action's list.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, SyncAction, &str) + Send + Sync>;

// ============================================================================
// ConnectionReport
// ============================================================================

/// Outcome of probing each authentication method a backend supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    /// `(method, outcome)`; `None` means the method is not configured.
    pub checks: Vec<(String, Option<bool>)>,
}

impl ConnectionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, method: impl Into<String>, outcome: Option<bool>) -> Self {
        self.checks.push((method.into(), outcome));
        self
    }

    /// True when at least one configured method succeeded.
    pub fn is_connected(&self) -> bool {
        self.checks.iter().any(|(_, outcome)| *outcome == Some(true))
    }
}

// ============================================================================
// IStorageBackend trait
// ============================================================================

/// Operations against one remote bucket.
///
/// Implementations must be safe to call concurrently; the execution engine
/// runs up to `max_workers` transfers at once against the same backend.
#[async_trait::async_trait]
pub trait IStorageBackend: Send + Sync {
    /// Registry name of this provider (`bunny`, `b2`, ...).
    fn provider_name(&self) -> &str;

    /// Establish or verify the connection.
    ///
    /// `Ok(false)` means the service answered but refused (bad key,
    /// unknown bucket).
    async fn connect(&self) -> anyhow::Result<bool>;

    /// Check every configured authentication method.
    async fn test_connection(&self) -> anyhow::Result<ConnectionReport> {
        let connected = self.connect().await?;
        Ok(ConnectionReport::new().with_check("connect", Some(connected)))
    }

    /// List every object under `prefix` (the whole bucket for `None`),
    /// keyed by bucket-relative path with forward slashes.
    async fn list_remote_files(&self, prefix: Option<&str>) -> anyhow::Result<RemoteFileMap>;

    /// Upload a local file to `remote_path`.
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> anyhow::Result<bool>;

    /// Download `remote_path` into `local_path`, replacing any existing file.
    /// The parent directory is expected to exist.
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> anyhow::Result<bool>;

    /// Delete `remote_path`. Deleting an absent object returns `Ok(true)`.
    async fn delete_file(&self, remote_path: &str) -> anyhow::Result<bool>;

    /// Public URL for an object.
    async fn get_public_url(&self, remote_path: &str) -> anyhow::Result<String>;

    /// Release held resources. The default does nothing.
    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
