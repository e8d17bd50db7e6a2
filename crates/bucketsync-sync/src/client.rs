//! Bucket client
//!
//! [`BucketClient`] ties a [`BucketConfig`] to the backend the provider
//! registry builds for it, and fills unspecified sync options from the
//! configuration.
//!
//! ## Design Notes
//!
//! A backend that fails to connect at construction only produces a
//! warning. The client is still returned, and the first real operation
//! reports the failure.

use std::path::Path;
use std::sync::Arc;

use bucketsync_core::config::BucketConfig;
use bucketsync_core::domain::{DomainError, RemoteFileMap, SyncResult};
use bucketsync_core::ports::{
    ConnectionReport, IStorageBackend, ProgressCallback, ProviderRegistry,
};
use tracing::{debug, info, warn};

use crate::engine::{SyncEngine, SyncRequest};
use crate::{checksum, SyncError};

/// Per-call overrides for a sync; `None` falls back to the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub max_workers: Option<usize>,
    pub delete_orphaned: Option<bool>,
    pub include_pattern: Option<String>,
    pub exclude_pattern: Option<String>,
    pub dry_run: bool,
    pub sync_paths: Option<Vec<String>>,
}

impl SyncOptions {
    /// Merge with configuration defaults.
    pub fn resolve(&self, config: &BucketConfig) -> SyncRequest {
        SyncRequest {
            max_workers: self.max_workers.unwrap_or(config.max_workers),
            delete_orphaned: self.delete_orphaned.unwrap_or(config.delete_orphaned),
            include_pattern: self.include_pattern.clone(),
            exclude_pattern: self.exclude_pattern.clone(),
            dry_run: self.dry_run,
            sync_paths: self
                .sync_paths
                .clone()
                .unwrap_or_else(|| config.sync_paths.clone()),
        }
    }
}

/// A configured connection to one bucket.
pub struct BucketClient {
    config: BucketConfig,
    engine: SyncEngine,
}

impl BucketClient {
    /// Validate `config` and construct its backend from `registry`.
    pub async fn new(config: BucketConfig, registry: &ProviderRegistry) -> Result<Self, SyncError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(SyncError::InvalidConfig(errors));
        }

        let backend = registry.create(&config).map_err(|e| match e.downcast::<DomainError>() {
            Ok(domain) => SyncError::DomainError(domain),
            Err(other) => SyncError::Backend(format!("{other:#}")),
        })?;

        Ok(Self::with_backend(config, backend).await)
    }

    /// Use an already constructed backend.
    pub async fn with_backend(config: BucketConfig, backend: Arc<dyn IStorageBackend>) -> Self {
        match backend.connect().await {
            Ok(true) => debug!(provider = %config.provider, "Connected to storage backend"),
            Ok(false) => warn!(
                provider = %config.provider,
                bucket = %config.bucket_name,
                "Failed to connect to storage backend"
            ),
            Err(e) => warn!(
                provider = %config.provider,
                bucket = %config.bucket_name,
                error = %format!("{e:#}"),
                "Failed to connect to storage backend"
            ),
        }

        let algorithm = checksum::resolve_algorithm(&config.checksum_algorithm);
        Self {
            engine: SyncEngine::new(backend, algorithm),
            config,
        }
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn IStorageBackend> {
        self.engine.backend()
    }

    /// Synchronize `local_path` with the bucket.
    pub async fn sync(
        &self,
        local_path: &Path,
        options: &SyncOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<SyncResult, SyncError> {
        let request = options.resolve(&self.config);
        self.engine.sync(local_path, &request, progress).await
    }

    pub async fn test_connection(&self) -> anyhow::Result<ConnectionReport> {
        self.backend().test_connection().await
    }

    /// Upload one file; the remote path defaults to the file name.
    ///
    /// Returns `Ok(false)` when the local file does not exist.
    pub async fn upload_file(
        &self,
        local_path: &Path,
        remote_path: Option<&str>,
    ) -> anyhow::Result<bool> {
        if !local_path.is_file() {
            warn!(path = %local_path.display(), "Local file not found");
            return Ok(false);
        }
        let remote = match remote_path {
            Some(remote) => remote.to_string(),
            None => local_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow::anyhow!("no file name in {}", local_path.display()))?,
        };
        info!(local = %local_path.display(), remote = %remote, "Uploading file");
        self.backend().upload_file(local_path, &remote).await
    }

    /// Download one object, creating the local parent directory first.
    pub async fn download_file(&self, remote_path: &str, local_path: &Path) -> anyhow::Result<bool> {
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        info!(remote = %remote_path, local = %local_path.display(), "Downloading file");
        self.backend().download_file(remote_path, local_path).await
    }

    pub async fn delete_file(&self, remote_path: &str) -> anyhow::Result<bool> {
        self.backend().delete_file(remote_path).await
    }

    pub async fn get_public_url(&self, remote_path: &str) -> anyhow::Result<String> {
        self.backend().get_public_url(remote_path).await
    }

    pub async fn list_files(&self, prefix: Option<&str>) -> anyhow::Result<RemoteFileMap> {
        self.backend().list_remote_files(prefix).await
    }

    pub async fn close(&self) -> anyhow::Result<()> {
        self.backend().close().await
    }
}
