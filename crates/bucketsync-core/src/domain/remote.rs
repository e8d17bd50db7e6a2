//! Local and remote file maps

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relative path → content digest for every regular file under a local root.
///
/// A `BTreeMap` keeps iteration sorted, which makes the derived plan and
/// the order of reported errors deterministic.
pub type FileDigestMap = BTreeMap<String, String>;

/// Remote path → object metadata, as reported by a storage backend.
pub type RemoteFileMap = BTreeMap<String, RemoteFileRecord>;

/// One object in a remote bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileRecord {
    /// Final path segment
    pub name: String,
    /// Bucket-relative path with forward slashes
    pub path: String,
    /// Object size in bytes
    pub size: u64,
    /// Provider-reported content checksum, when the provider surfaces one
    pub checksum: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Provider-specific object identifier (Bunny GUID, B2 file id, ...)
    pub provider_id: Option<String>,
}

impl RemoteFileRecord {
    /// Minimal record for a path, with `name` derived from its last segment.
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            name,
            path,
            size,
            checksum: None,
            last_modified: None,
            provider_id: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    pub fn with_provider_id(mut self, id: impl Into<String>) -> Self {
        self.provider_id = Some(id.into());
        self
    }

    /// Exact, case-sensitive comparison against a local digest.
    ///
    /// An empty or absent digest on either side never matches, so an
    /// unreadable local file or a provider without checksums always
    /// counts as changed.
    pub fn checksum_matches(&self, local_digest: &str) -> bool {
        match self.checksum.as_deref() {
            Some(remote) if !remote.is_empty() && !local_digest.is_empty() => {
                remote == local_digest
            }
            _ => false,
        }
    }
}
