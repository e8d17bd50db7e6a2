//! S3-compatible and Linode Object Storage backend
//!
//! Both providers speak the S3 protocol and share one opendal operator;
//! they differ only in the default endpoint and public URL shape.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bucketsync_core::config::BucketConfig;
use bucketsync_core::domain::{RemoteFileMap, RemoteFileRecord};
use bucketsync_core::ports::IStorageBackend;
use futures_util::TryStreamExt;
use opendal::{layers::TimeoutLayer, Metakey, Operator};
use tracing::{debug, error, info, instrument};

use crate::local::write_atomic;
use crate::ProviderError;

/// Per-operation timeout
const OP_TIMEOUT_SECS: u64 = 60;
/// Timeout for a single IO chunk
const IO_TIMEOUT_SECS: u64 = 30;
/// Region used when none is configured
const DEFAULT_REGION: &str = "us-east-1";

/// Which S3 dialect a backend targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Flavor {
    /// Amazon S3 or any endpoint given through the `endpoint` setting
    Aws,
    /// Linode Object Storage (`{region}.linodeobjects.com`)
    Linode,
}

impl S3Flavor {
    pub fn provider_name(self) -> &'static str {
        match self {
            Self::Aws => "s3",
            Self::Linode => "linode",
        }
    }
}

/// Storage backend for an S3 bucket.
#[derive(Debug, Clone)]
pub struct S3Backend {
    operator: Operator,
    flavor: S3Flavor,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    cdn_url: Option<String>,
}

impl S3Backend {
    /// Build a backend from a bucket configuration.
    ///
    /// Credentials are `access_key_id` (or `token_id`) and
    /// `secret_access_key` (or `token`). Linode buckets default their
    /// endpoint to `https://{region}.linodeobjects.com`.
    pub fn from_config(config: &BucketConfig, flavor: S3Flavor) -> Result<Self, ProviderError> {
        let access_key = config
            .credential_any(&["access_key_id", "token_id"])
            .ok_or_else(|| ProviderError::MissingCredential("access_key_id".into()))?;
        let secret_key = config
            .credential_any(&["secret_access_key", "token"])
            .ok_or_else(|| ProviderError::MissingCredential("secret_access_key".into()))?;

        let region = config
            .region
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let endpoint = match (config.provider_setting("endpoint"), flavor) {
            (Some(endpoint), _) => Some(endpoint.trim_end_matches('/').to_string()),
            (None, S3Flavor::Linode) => Some(format!("https://{region}.linodeobjects.com")),
            (None, S3Flavor::Aws) => None,
        };

        use opendal::services::S3;

        let mut builder = S3::default()
            .bucket(&config.bucket_name)
            .region(&region)
            .access_key_id(&access_key)
            .secret_access_key(&secret_key);

        if let Some(ref ep) = endpoint {
            builder = builder.endpoint(ep);
        }

        let operator = Operator::new(builder)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        Ok(Self {
            operator,
            flavor,
            bucket: config.bucket_name.clone(),
            region,
            endpoint: config
                .provider_setting("endpoint")
                .map(|ep| ep.trim_end_matches('/').to_string()),
            cdn_url: config
                .provider_setting("cdn_url")
                .map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    /// Public URL for `path` without consulting the service.
    fn public_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if let Some(cdn) = &self.cdn_url {
            return format!("{cdn}/{path}");
        }
        if let Some(endpoint) = &self.endpoint {
            return format!("{endpoint}/{}/{path}", self.bucket);
        }
        match self.flavor {
            S3Flavor::Linode => format!(
                "https://{}.{}.linodeobjects.com/{path}",
                self.bucket, self.region
            ),
            S3Flavor::Aws => format!(
                "https://{}.s3.{}.amazonaws.com/{path}",
                self.bucket, self.region
            ),
        }
    }
}

#[async_trait]
impl IStorageBackend for S3Backend {
    fn provider_name(&self) -> &str {
        self.flavor.provider_name()
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn connect(&self) -> Result<bool> {
        match self.operator.list("").await {
            Ok(_) => {
                info!("Connected to S3 bucket");
                Ok(true)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    opendal::ErrorKind::PermissionDenied | opendal::ErrorKind::NotFound
                ) =>
            {
                error!(error = %e, "Failed to connect to S3 bucket");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_remote_files(&self, prefix: Option<&str>) -> Result<RemoteFileMap> {
        let path = match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(p) => format!("{p}/"),
            None => String::new(),
        };

        let mut lister = self
            .operator
            .lister_with(&path)
            .recursive(true)
            .metakey(
                Metakey::ContentLength | Metakey::LastModified | Metakey::Mode | Metakey::Etag,
            )
            .await
            .context("Failed to list remote files")?;

        let mut files = RemoteFileMap::new();
        while let Some(entry) = lister.try_next().await? {
            let key = entry.path().trim_start_matches('/').to_string();
            let meta = entry.metadata();
            if key.is_empty() || meta.is_dir() {
                continue;
            }

            let mut record = RemoteFileRecord::new(key.clone(), meta.content_length());
            if let Some(etag) = meta.etag().map(|s| s.trim_matches('"')).filter(|s| !s.is_empty()) {
                record = record.with_checksum(etag);
            }
            if let Some(modified) = meta.last_modified() {
                record = record.with_last_modified(modified);
            }
            files.insert(key, record);
        }

        debug!(count = files.len(), "Listed remote files");
        Ok(files)
    }

    #[instrument(skip(self, local_path), fields(bucket = %self.bucket))]
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<bool> {
        let data = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;
        self.operator
            .write(remote_path.trim_start_matches('/'), data)
            .await?;
        Ok(true)
    }

    #[instrument(skip(self, local_path), fields(bucket = %self.bucket))]
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<bool> {
        let data = match self.operator.read(remote_path.trim_start_matches('/')).await {
            Ok(buffer) => buffer.to_vec(),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {
                error!("Failed to download {remote_path}: not found");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        write_atomic(local_path, &data)
            .await
            .with_context(|| format!("Failed to write {}", local_path.display()))?;
        Ok(true)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete_file(&self, remote_path: &str) -> Result<bool> {
        // Deleting an absent key succeeds on S3
        self.operator
            .delete(remote_path.trim_start_matches('/'))
            .await?;
        Ok(true)
    }

    async fn get_public_url(&self, remote_path: &str) -> Result<String> {
        Ok(self.public_url(remote_path))
    }
}
