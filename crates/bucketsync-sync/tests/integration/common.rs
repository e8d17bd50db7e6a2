//! Shared test infrastructure: an in-memory storage backend

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use bucketsync_core::domain::{RemoteFileMap, RemoteFileRecord};
use bucketsync_core::ports::IStorageBackend;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// Bucket kept in memory. Checksums are sha256 of the stored bytes, so a
/// local sha256 scan matches objects this backend stored.
#[derive(Default)]
pub struct MemoryBackend {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    pub refuse_connect: AtomicBool,
    pub fail_listing: AtomicBool,
    pub transfers: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, content: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_vec());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Make every transfer of `path` raise an error.
    pub fn fail_on(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }

    fn check_failure(&self, path: &str) -> anyhow::Result<()> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(path) {
            anyhow::bail!("simulated failure");
        }
        Ok(())
    }
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[async_trait::async_trait]
impl IStorageBackend for MemoryBackend {
    fn provider_name(&self) -> &str {
        "memory"
    }

    async fn connect(&self) -> anyhow::Result<bool> {
        Ok(!self.refuse_connect.load(Ordering::SeqCst))
    }

    async fn list_remote_files(&self, prefix: Option<&str>) -> anyhow::Result<RemoteFileMap> {
        if self.fail_listing.load(Ordering::SeqCst) {
            anyhow::bail!("listing timed out");
        }
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(path, _)| prefix.map_or(true, |p| path.starts_with(p)))
            .map(|(path, content)| {
                let record = RemoteFileRecord::new(path.clone(), content.len() as u64)
                    .with_checksum(sha256_hex(content));
                (path.clone(), record)
            })
            .collect())
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> anyhow::Result<bool> {
        self.check_failure(remote_path)?;
        let content = tokio::fs::read(local_path).await?;
        self.put(remote_path, &content);
        Ok(true)
    }

    async fn download_file(&self, remote_path: &str, local_path: &Path) -> anyhow::Result<bool> {
        self.check_failure(remote_path)?;
        match self.get(remote_path) {
            Some(content) => {
                tokio::fs::write(local_path, content).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_file(&self, remote_path: &str) -> anyhow::Result<bool> {
        self.check_failure(remote_path)?;
        self.objects.lock().unwrap().remove(remote_path);
        Ok(true)
    }

    async fn get_public_url(&self, remote_path: &str) -> anyhow::Result<String> {
        Ok(format!("memory://bucket/{remote_path}"))
    }
}

/// Create a temporary directory containing `files` (relative path → content).
pub fn local_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(full, content).expect("write file");
    }
    dir
}
