//! Bunny.net Storage backend
//!
//! Talks to the Bunny.net edge storage HTTP API. Every request carries the
//! storage zone password in the `AccessKey` header.
//!
//! ## Endpoints
//!
//! | Operation | Request                           |
//! |-----------|-----------------------------------|
//! | list      | `GET {base}/{zone}/{dir}/`        |
//! | upload    | `PUT {base}/{zone}/{path}`        |
//! | download  | `GET {base}/{zone}/{path}`        |
//! | delete    | `DELETE {base}/{zone}/{path}`     |
//!
//! Directory listings are not recursive on the server side, so
//! [`BunnyBackend::list_remote_files`] walks sub-directories itself.
//!
//! Cache purges go to the account API instead
//! (`POST {api}/pullzone/{pull_zone}/purgeCache`) and need the
//! `pull_zone_name` setting.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bucketsync_core::config::BucketConfig;
use bucketsync_core::domain::{RemoteFileMap, RemoteFileRecord};
use bucketsync_core::ports::{ConnectionReport, IStorageBackend};
use chrono::{NaiveDateTime, TimeZone, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::local::write_atomic;
use crate::ProviderError;

/// Default storage API hostname
const DEFAULT_HOSTNAME: &str = "storage.bunnycdn.com";
/// Account API used for pull zone operations
const DEFAULT_API_BASE_URL: &str = "https://api.bunny.net";

// ============================================================================
// API response types
// ============================================================================

/// One entry of a directory listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StorageObject {
    object_name: Option<String>,
    #[serde(default)]
    is_directory: bool,
    #[serde(default)]
    length: u64,
    last_changed: Option<String>,
    checksum: Option<String>,
    guid: Option<String>,
}

/// Outcome of a [`BunnyBackend::purge_cache`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// True when nothing failed
    pub success: bool,
    /// Paths purged, or 1 after a full purge
    pub purged: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

fn parse_last_changed(raw: &str) -> Option<chrono::DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// ============================================================================
// BunnyBackend
// ============================================================================

/// Storage backend for a Bunny.net storage zone.
#[derive(Debug, Clone)]
pub struct BunnyBackend {
    client: Client,
    base_url: Url,
    zone: String,
    api_key: String,
    hostname: String,
    cdn_url: Option<String>,
    authenticated_cdn_endpoint: Option<String>,
    password: Option<String>,
    pull_zone_name: Option<String>,
    api_base_url: String,
    account_api_key: Option<String>,
}

impl BunnyBackend {
    /// Build a backend from a bucket configuration.
    ///
    /// The key is read from the `storage_api_key` or `api_key` credential.
    /// `base_url` overrides the storage endpoint entirely; otherwise a
    /// configured region selects `https://{region}.{hostname}`.
    pub fn from_config(config: &BucketConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .credential_any(&["storage_api_key", "api_key"])
            .ok_or_else(|| ProviderError::MissingCredential("api_key".into()))?;

        let hostname = config
            .provider_setting("hostname")
            .unwrap_or(DEFAULT_HOSTNAME)
            .to_string();

        let base = match config.provider_setting("base_url") {
            Some(base) => base.to_string(),
            None => match config.region.as_deref().filter(|r| !r.is_empty()) {
                Some(region) => format!("https://{region}.{hostname}"),
                None => format!("https://{hostname}"),
            },
        };

        let mut backend = Self::with_base_url(&config.bucket_name, api_key, &base)?;
        backend.hostname = hostname;
        backend.cdn_url = config.provider_setting("cdn_url").map(trim_slash);
        backend.authenticated_cdn_endpoint = config
            .provider_setting("authenticated_cdn_endpoint")
            .map(trim_slash);
        backend.password = config.credential("password");
        backend.pull_zone_name = config
            .provider_setting("pull_zone_name")
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        if let Some(api_base) = config.provider_setting("api_base_url") {
            backend.api_base_url = trim_slash(api_base);
        }
        backend.account_api_key = config.credential("api_key");
        Ok(backend)
    }

    /// Creates a backend against a custom storage endpoint (useful for testing)
    pub fn with_base_url(
        zone: impl Into<String>,
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url).map_err(|e| ProviderError::InvalidSetting {
            key: "base_url".into(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidSetting {
                key: "base_url".into(),
                message: "not a hierarchical URL".into(),
            });
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            zone: zone.into(),
            api_key: api_key.into(),
            hostname: DEFAULT_HOSTNAME.to_string(),
            cdn_url: None,
            authenticated_cdn_endpoint: None,
            password: None,
            pull_zone_name: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            account_api_key: None,
        })
    }

    /// Enables cache purging for `pull_zone` through the account API at
    /// `api_base_url`.
    pub fn with_pull_zone(mut self, pull_zone: impl Into<String>, api_base_url: &str) -> Self {
        self.pull_zone_name = Some(pull_zone.into());
        self.api_base_url = trim_slash(api_base_url);
        self
    }

    /// Storage zone name
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Storage endpoint requests are sent to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{zone}/{path}`; a trailing `/` in `path` is kept.
    fn object_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("storage endpoint cannot be a base URL"))?;
            segments.pop_if_empty().push(&self.zone);
            segments.extend(path.trim_start_matches('/').split('/'));
        }
        Ok(url)
    }

    /// Purge `paths` from the pull zone cache, or the whole zone when
    /// `paths` is `None` or empty.
    ///
    /// Each path is purged with its own request. A path whose request is
    /// not answered with 204 is counted as failed and described in
    /// [`PurgeReport::errors`]; transport errors stop the run.
    #[instrument(skip(self, paths), fields(zone = %self.zone))]
    pub async fn purge_cache(&self, paths: Option<&[String]>) -> Result<PurgeReport> {
        let Some(pull_zone) = &self.pull_zone_name else {
            error!("Pull zone name is required for cache purging");
            return Ok(PurgeReport {
                errors: vec!["Pull zone name not configured".to_string()],
                ..PurgeReport::default()
            });
        };

        let key = self.account_api_key.as_deref().unwrap_or(&self.api_key);
        let url = format!("{}/pullzone/{pull_zone}/purgeCache", self.api_base_url);
        let mut report = PurgeReport::default();

        match paths.filter(|p| !p.is_empty()) {
            Some(paths) => {
                for path in paths {
                    let response = self
                        .client
                        .post(&url)
                        .header("AccessKey", key)
                        .json(&json!({ "url": path }))
                        .send()
                        .await
                        .context("Failed to send purge request")?;
                    let status = response.status();
                    if status == StatusCode::NO_CONTENT {
                        debug!(path = %path, "Purged");
                        report.purged += 1;
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        report.failed += 1;
                        report.errors.push(format!(
                            "Failed to purge {path}: {} {body}",
                            status.as_u16()
                        ));
                    }
                }
            }
            None => {
                let response = self
                    .client
                    .post(format!("{url}/purgeEverything"))
                    .header("AccessKey", key)
                    .send()
                    .await
                    .context("Failed to send purge request")?;
                let status = response.status();
                if status == StatusCode::NO_CONTENT {
                    info!("Purged all cache");
                    report.purged = 1;
                } else {
                    let body = response.text().await.unwrap_or_default();
                    report.failed = 1;
                    report.errors.push(format!(
                        "Failed to purge cache: {} {body}",
                        status.as_u16()
                    ));
                }
            }
        }

        report.success = report.failed == 0;
        if !report.success {
            warn!(failed = report.failed, "Cache purge incomplete");
        }
        Ok(report)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("AccessKey", &self.api_key)
            .header("Accept", "application/json")
    }

    /// Fetch one directory listing. `dir` is empty for the zone root.
    async fn list_directory(&self, dir: &str) -> Result<Vec<StorageObject>> {
        let listing_path = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };
        let url = self.object_url(&listing_path)?;
        debug!(%url, "Listing directory");

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .context("Failed to send listing request")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND && !dir.is_empty() {
            // A scope prefix that does not exist remotely lists as empty
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                message: format!("Failed to list remote files: {body}"),
            }
            .into());
        }

        let items: Vec<Option<StorageObject>> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(items.into_iter().flatten().collect())
    }
}

fn trim_slash(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

#[async_trait]
impl IStorageBackend for BunnyBackend {
    fn provider_name(&self) -> &str {
        "bunny"
    }

    #[instrument(skip(self), fields(zone = %self.zone))]
    async fn connect(&self) -> Result<bool> {
        let url = self.object_url("")?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .context("Failed to connect to Bunny.net")?;

        match response.status() {
            StatusCode::OK => {
                info!("Connected to Bunny.net storage zone");
                Ok(true)
            }
            StatusCode::UNAUTHORIZED => {
                error!("Authentication failed: invalid API key");
                Ok(false)
            }
            StatusCode::NOT_FOUND => {
                error!("Storage zone not found");
                Ok(false)
            }
            status => {
                error!(status = status.as_u16(), "Failed to connect to Bunny.net");
                Ok(false)
            }
        }
    }

    async fn test_connection(&self) -> Result<ConnectionReport> {
        let api_key = match self.connect().await {
            Ok(connected) => connected,
            Err(e) => {
                error!(error = %e, "API key connection test failed");
                false
            }
        };
        let mut report = ConnectionReport::new().with_check("api_key", Some(api_key));

        let password_check = match (&self.password, &self.authenticated_cdn_endpoint) {
            (Some(_), Some(endpoint)) => {
                let outcome = match self.client.get(format!("{endpoint}/")).send().await {
                    // An empty directory answers 404
                    Ok(resp) => matches!(resp.status(), StatusCode::OK | StatusCode::NOT_FOUND),
                    Err(e) => {
                        error!(error = %e, "Password connection test failed");
                        false
                    }
                };
                Some(outcome)
            }
            _ => None,
        };
        report = report.with_check("password", password_check);
        Ok(report)
    }

    #[instrument(skip(self), fields(zone = %self.zone))]
    async fn list_remote_files(&self, prefix: Option<&str>) -> Result<RemoteFileMap> {
        let root = prefix.unwrap_or("").trim_matches('/').to_string();
        let mut files = RemoteFileMap::new();
        let mut pending = vec![root];

        while let Some(dir) = pending.pop() {
            for item in self.list_directory(&dir).await? {
                let Some(name) = item.object_name.filter(|n| !n.is_empty()) else {
                    warn!(dir = %dir, "Skipping listing entry without a name");
                    continue;
                };
                let path = if dir.is_empty() {
                    name.clone()
                } else {
                    format!("{dir}/{name}")
                };

                if item.is_directory {
                    pending.push(path);
                    continue;
                }

                let mut record = RemoteFileRecord::new(path.clone(), item.length);
                if let Some(checksum) = item.checksum.filter(|c| !c.is_empty()) {
                    record = record.with_checksum(checksum);
                }
                if let Some(changed) = item.last_changed.as_deref().and_then(parse_last_changed) {
                    record = record.with_last_modified(changed);
                }
                if let Some(guid) = item.guid {
                    record = record.with_provider_id(guid);
                }
                files.insert(path, record);
            }
        }

        debug!(count = files.len(), "Listed remote files");
        Ok(files)
    }

    #[instrument(skip(self, local_path), fields(zone = %self.zone))]
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<bool> {
        let data = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;
        let url = self.object_url(remote_path)?;
        let content_type = mime_guess::from_path(local_path).first_or_octet_stream();

        let response = self
            .request(Method::PUT, url)
            .header("Content-Type", content_type.essence_str())
            .body(data)
            .send()
            .await
            .context("Failed to send upload request")?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                debug!("Uploaded");
                Ok(true)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(status = status.as_u16(), body = %body, "Failed to upload {remote_path}");
                Ok(false)
            }
        }
    }

    #[instrument(skip(self, local_path), fields(zone = %self.zone))]
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<bool> {
        let url = self.object_url(remote_path)?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .context("Failed to send download request")?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(status = status.as_u16(), "Failed to download {remote_path}");
            return Ok(false);
        }

        let data = response
            .bytes()
            .await
            .context("Failed to read download body")?;
        write_atomic(local_path, &data)
            .await
            .with_context(|| format!("Failed to write {}", local_path.display()))?;
        debug!(bytes = data.len(), "Downloaded");
        Ok(true)
    }

    #[instrument(skip(self), fields(zone = %self.zone))]
    async fn delete_file(&self, remote_path: &str) -> Result<bool> {
        let url = self.object_url(remote_path)?;
        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .context("Failed to send delete request")?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => {
                debug!("Already absent");
                Ok(true)
            }
            status => {
                error!(status = status.as_u16(), "Failed to delete {remote_path}");
                Ok(false)
            }
        }
    }

    async fn get_public_url(&self, remote_path: &str) -> Result<String> {
        let path = remote_path.trim_start_matches('/');
        if let (Some(_), Some(endpoint)) = (&self.password, &self.authenticated_cdn_endpoint) {
            return Ok(format!("{endpoint}/{path}"));
        }
        if let Some(cdn) = &self.cdn_url {
            return Ok(format!("{cdn}/{path}"));
        }
        Ok(format!("https://{}.{}/{path}", self.zone, self.hostname))
    }
}
