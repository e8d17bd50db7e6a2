//! Backblaze B2 backend (native API v2)
//!
//! Authorisation is acquired lazily on first use and cached together with
//! the bucket id. An API call answered with 401 drops the cached session and
//! is retried once with a fresh authorisation, which covers token expiry on
//! long-running syncs.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bucketsync_core::config::BucketConfig;
use bucketsync_core::domain::{RemoteFileMap, RemoteFileRecord};
use bucketsync_core::ports::{ConnectionReport, IStorageBackend};
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha1::{Digest, Sha1};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::local::write_atomic;
use crate::ProviderError;

/// Default authorisation endpoint
const DEFAULT_API_URL: &str = "https://api.backblazeb2.com";

/// Page size for `b2_list_file_names`
const LIST_PAGE_SIZE: u32 = 1000;

// ============================================================================
// API types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeResponse {
    account_id: String,
    authorization_token: String,
    api_url: String,
    download_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketInfo {
    bucket_id: String,
    bucket_name: String,
}

#[derive(Debug, Deserialize)]
struct ListBucketsResponse {
    buckets: Vec<BucketInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileVersion {
    file_name: String,
    file_id: Option<String>,
    #[serde(default)]
    content_length: u64,
    content_sha1: Option<String>,
    #[serde(default)]
    action: String,
    upload_timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFileNamesResponse {
    files: Vec<FileVersion>,
    next_file_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListFileNamesRequest<'a> {
    bucket_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_file_name: Option<&'a str>,
    max_file_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlResponse {
    upload_url: String,
    authorization_token: String,
}

/// Cached authorisation for one bucket
#[derive(Debug, Clone)]
struct B2Session {
    authorization_token: String,
    api_url: String,
    download_url: String,
    bucket_id: String,
}

/// Percent-encode a file name for `X-Bz-File-Name` and download URLs,
/// keeping `/` separators.
fn encode_file_name(name: &str) -> String {
    let mut url = match Url::parse("b2://file/") {
        Ok(url) => url,
        Err(_) => return name.to_string(),
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().extend(name.split('/'));
    }
    url.path().trim_start_matches('/').to_string()
}

// ============================================================================
// B2Backend
// ============================================================================

/// Storage backend for a Backblaze B2 bucket.
#[derive(Debug)]
pub struct B2Backend {
    client: Client,
    auth_url: String,
    key_id: String,
    application_key: String,
    bucket_name: String,
    cdn_url: Option<String>,
    session: Mutex<Option<B2Session>>,
}

impl B2Backend {
    /// Build a backend from a bucket configuration.
    ///
    /// Reads `application_key_id` (or `token_id`) and `application_key`
    /// (or `token`). The `api_url` setting replaces the authorisation host.
    pub fn from_config(config: &BucketConfig) -> Result<Self, ProviderError> {
        let key_id = config
            .credential_any(&["application_key_id", "token_id"])
            .ok_or_else(|| ProviderError::MissingCredential("application_key_id".into()))?;
        let application_key = config
            .credential_any(&["application_key", "token"])
            .ok_or_else(|| ProviderError::MissingCredential("application_key".into()))?;

        let mut backend = Self::with_api_url(
            &config.bucket_name,
            key_id,
            application_key,
            config.provider_setting("api_url").unwrap_or(DEFAULT_API_URL),
        );
        backend.cdn_url = config
            .provider_setting("cdn_url")
            .map(|url| url.trim_end_matches('/').to_string());
        Ok(backend)
    }

    /// Creates a backend against a custom authorisation endpoint (useful for testing)
    pub fn with_api_url(
        bucket_name: impl Into<String>,
        key_id: impl Into<String>,
        application_key: impl Into<String>,
        api_url: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            auth_url: api_url.trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            application_key: application_key.into(),
            bucket_name: bucket_name.into(),
            cdn_url: None,
            session: Mutex::new(None),
        }
    }

    /// Authorise the account and resolve the bucket id.
    async fn authorize(&self) -> Result<B2Session> {
        let url = format!("{}/b2api/v2/b2_authorize_account", self.auth_url);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.application_key))
            .send()
            .await
            .context("Failed to reach B2 authorisation endpoint")?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized("B2 rejected the application key".into()).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }
        let auth: AuthorizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let url = format!("{}/b2api/v2/b2_list_buckets", auth.api_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", &auth.authorization_token)
            .json(&json!({ "accountId": auth.account_id, "bucketName": self.bucket_name }))
            .send()
            .await
            .context("Failed to list B2 buckets")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }
        let buckets: ListBucketsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let bucket = buckets
            .buckets
            .into_iter()
            .find(|b| b.bucket_name == self.bucket_name)
            .ok_or_else(|| ProviderError::NotFound(format!("bucket {}", self.bucket_name)))?;

        info!(bucket = %self.bucket_name, "Authorised with Backblaze B2");
        Ok(B2Session {
            authorization_token: auth.authorization_token,
            api_url: auth.api_url,
            download_url: auth.download_url,
            bucket_id: bucket.bucket_id,
        })
    }

    /// Cached session, authorising on first use.
    async fn session(&self) -> Result<B2Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.authorize().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    /// POST a JSON body to `{apiUrl}/b2api/v2/{operation}`.
    async fn api_call<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        for attempt in 0..2 {
            let session = self.session().await?;
            let url = format!("{}/b2api/v2/{operation}", session.api_url);
            let response = self
                .client
                .post(&url)
                .header("Authorization", &session.authorization_token)
                .json(body)
                .send()
                .await
                .with_context(|| format!("Failed to call {operation}"))?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!(operation, "B2 authorisation expired, re-authorising");
                self.invalidate_session().await;
                continue;
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ProviderError::HttpStatus {
                    status: status.as_u16(),
                    message,
                }
                .into());
            }
            return response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()).into());
        }
        Err(ProviderError::Unauthorized(format!("{operation} rejected the authorisation token")).into())
    }

    async fn list_page(
        &self,
        bucket_id: &str,
        prefix: Option<&str>,
        start: Option<&str>,
        max: u32,
    ) -> Result<ListFileNamesResponse> {
        let request = ListFileNamesRequest {
            bucket_id,
            prefix,
            start_file_name: start,
            max_file_count: max,
        };
        let body = serde_json::to_value(&request).context("Failed to encode listing request")?;
        self.api_call("b2_list_file_names", &body).await
    }

    fn download_url(&self, session: &B2Session, remote_path: &str) -> String {
        format!(
            "{}/file/{}/{}",
            session.download_url.trim_end_matches('/'),
            self.bucket_name,
            encode_file_name(remote_path.trim_start_matches('/'))
        )
    }
}

fn is_expected_refusal(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<ProviderError>(),
        Some(ProviderError::Unauthorized(_) | ProviderError::NotFound(_))
    )
}

#[async_trait]
impl IStorageBackend for B2Backend {
    fn provider_name(&self) -> &str {
        "b2"
    }

    #[instrument(skip(self), fields(bucket = %self.bucket_name))]
    async fn connect(&self) -> Result<bool> {
        self.invalidate_session().await;
        match self.session().await {
            Ok(_) => Ok(true),
            Err(e) if is_expected_refusal(&e) => {
                error!(error = %e, "Failed to connect to Backblaze B2");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn test_connection(&self) -> Result<ConnectionReport> {
        self.invalidate_session().await;
        let url = format!("{}/b2api/v2/b2_authorize_account", self.auth_url);
        let auth_ok = match self
            .client
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.application_key))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                error!(error = %e, "B2 authorisation test failed");
                false
            }
        };

        let bucket_ok = if auth_ok {
            match self.session().await {
                Ok(_) => true,
                Err(e) => {
                    error!(error = %e, "B2 bucket access test failed");
                    false
                }
            }
        } else {
            false
        };

        Ok(ConnectionReport::new()
            .with_check("b2_auth", Some(auth_ok))
            .with_check("bucket_access", Some(bucket_ok)))
    }

    #[instrument(skip(self), fields(bucket = %self.bucket_name))]
    async fn list_remote_files(&self, prefix: Option<&str>) -> Result<RemoteFileMap> {
        let session = self.session().await?;
        let prefix = prefix
            .map(|p| p.trim_start_matches('/'))
            .filter(|p| !p.is_empty());

        let mut files = RemoteFileMap::new();
        let mut start: Option<String> = None;
        loop {
            let page = self
                .list_page(&session.bucket_id, prefix, start.as_deref(), LIST_PAGE_SIZE)
                .await?;

            for version in page.files {
                if version.action != "upload" || version.file_name.ends_with('/') {
                    continue;
                }
                let mut record =
                    RemoteFileRecord::new(version.file_name.clone(), version.content_length);
                if let Some(sha1) = version.content_sha1.filter(|s| !s.is_empty() && s != "none") {
                    record = record.with_checksum(sha1);
                }
                if let Some(ts) = version
                    .upload_timestamp
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                {
                    record = record.with_last_modified(ts);
                }
                if let Some(id) = version.file_id {
                    record = record.with_provider_id(id);
                }
                files.insert(version.file_name, record);
            }

            match page.next_file_name {
                Some(next) => start = Some(next),
                None => break,
            }
        }

        debug!(count = files.len(), "Listed remote files");
        Ok(files)
    }

    #[instrument(skip(self, local_path), fields(bucket = %self.bucket_name))]
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<bool> {
        let data = tokio::fs::read(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;
        let sha1 = hex::encode(Sha1::digest(&data));

        let session = self.session().await?;
        let target: UploadUrlResponse = self
            .api_call("b2_get_upload_url", &json!({ "bucketId": session.bucket_id }))
            .await?;

        let response = self
            .client
            .post(&target.upload_url)
            .header("Authorization", &target.authorization_token)
            .header("X-Bz-File-Name", encode_file_name(remote_path.trim_start_matches('/')))
            .header("Content-Type", "b2/x-auto")
            .header("X-Bz-Content-Sha1", sha1)
            .body(data)
            .send()
            .await
            .context("Failed to send upload request")?;

        let status = response.status();
        if status.is_success() {
            debug!("Uploaded");
            Ok(true)
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Failed to upload {remote_path}");
            Ok(false)
        }
    }

    #[instrument(skip(self, local_path), fields(bucket = %self.bucket_name))]
    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<bool> {
        let session = self.session().await?;
        let response = self
            .client
            .get(self.download_url(&session, remote_path))
            .header("Authorization", &session.authorization_token)
            .send()
            .await
            .context("Failed to send download request")?;

        let status = response.status();
        if !status.is_success() {
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
        Ok(true)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket_name))]
    async fn delete_file(&self, remote_path: &str) -> Result<bool> {
        let name = remote_path.trim_start_matches('/');
        let session = self.session().await?;
        let page = self
            .list_page(&session.bucket_id, Some(name), Some(name), 1)
            .await?;

        let Some(file_id) = page
            .files
            .into_iter()
            .find(|f| f.file_name == name)
            .and_then(|f| f.file_id)
        else {
            debug!("Already absent");
            return Ok(true);
        };

        match self
            .api_call::<serde_json::Value>(
                "b2_delete_file_version",
                &json!({ "fileName": name, "fileId": file_id }),
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match e.downcast_ref::<ProviderError>() {
                Some(ProviderError::HttpStatus { status, .. }) => {
                    error!(status, "Failed to delete {remote_path}");
                    Ok(false)
                }
                _ => Err(e),
            },
        }
    }

    async fn get_public_url(&self, remote_path: &str) -> Result<String> {
        if let Some(cdn) = &self.cdn_url {
            return Ok(format!("{cdn}/{}", remote_path.trim_start_matches('/')));
        }
        let session = self.session().await?;
        Ok(self.download_url(&session, remote_path))
    }

    async fn close(&self) -> Result<()> {
        self.invalidate_session().await;
        Ok(())
    }
}
