//! `BucketClient` construction and single-file operations

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bucketsync_core::config::{BucketConfig, BucketConfigBuilder};
use bucketsync_core::domain::DomainError;
use bucketsync_core::ports::{IStorageBackend, ProviderRegistry};
use bucketsync_sync::{BucketClient, SyncError, SyncOptions};

use crate::common::{local_tree, MemoryBackend};

fn registry_with(backend: &Arc<MemoryBackend>) -> ProviderRegistry {
    let shared = Arc::clone(backend);
    let mut registry = ProviderRegistry::new();
    registry.register("memory", move |_config: &BucketConfig| {
        Ok(Arc::clone(&shared) as Arc<dyn IStorageBackend>)
    });
    registry
}

#[tokio::test]
async fn unknown_provider_is_a_configuration_error() {
    let backend = Arc::new(MemoryBackend::new());
    let result = BucketClient::new(
        BucketConfig::new("carrier-pigeon", "bucket"),
        &registry_with(&backend),
    )
    .await;
    assert!(matches!(
        result,
        Err(SyncError::DomainError(DomainError::UnknownProvider(ref name))) if name == "carrier-pigeon"
    ));
}

#[tokio::test]
async fn invalid_config_is_rejected_before_backend_construction() {
    let backend = Arc::new(MemoryBackend::new());
    let config = BucketConfigBuilder::new("memory", "bucket").max_workers(0).build();
    let result = BucketClient::new(config, &registry_with(&backend)).await;
    match result {
        Err(SyncError::InvalidConfig(errors)) => assert_eq!(errors[0].field, "max_workers"),
        other => panic!("expected InvalidConfig, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn refused_connection_still_constructs_the_client() {
    let backend = Arc::new(MemoryBackend::new());
    backend.refuse_connect.store(true, Ordering::SeqCst);

    let client = BucketClient::new(BucketConfig::new("memory", "bucket"), &registry_with(&backend))
        .await
        .expect("client despite refused connection");
    let report = client.test_connection().await.unwrap();
    assert!(!report.is_connected());
}

#[tokio::test]
async fn sync_uses_configured_scope_and_deletion_policy() {
    let dir = local_tree(&[("docs/a.md", "a"), ("src/lib.rs", "lib")]);
    let backend = Arc::new(MemoryBackend::new());
    backend.put("docs/stale.md", b"stale");
    backend.put("other/keep.bin", b"keep");
    let config = BucketConfigBuilder::new("memory", "bucket")
        .sync_paths(["docs"])
        .delete_orphaned(true)
        .build();

    let client = BucketClient::new(config, &registry_with(&backend)).await.unwrap();
    let result = client
        .sync(dir.path(), &SyncOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(result.uploaded, 1);
    assert_eq!(result.deleted, 1);
    assert_eq!(backend.paths(), vec!["docs/a.md", "other/keep.bin"]);
}

#[tokio::test]
async fn upload_defaults_remote_path_to_file_name() {
    let dir = local_tree(&[("nested/report.pdf", "pdf")]);
    let backend = Arc::new(MemoryBackend::new());
    let client = BucketClient::with_backend(
        BucketConfig::new("memory", "bucket"),
        Arc::clone(&backend) as Arc<dyn IStorageBackend>,
    )
    .await;

    assert!(client
        .upload_file(&dir.path().join("nested/report.pdf"), None)
        .await
        .unwrap());
    assert_eq!(backend.get("report.pdf").unwrap(), b"pdf");

    assert!(!client
        .upload_file(&dir.path().join("missing.pdf"), Some("x.pdf"))
        .await
        .unwrap());
}

#[tokio::test]
async fn download_creates_parent_directory() {
    let dir = local_tree(&[]);
    let backend = Arc::new(MemoryBackend::new());
    backend.put("a/b.txt", b"bee");
    let client = BucketClient::with_backend(
        BucketConfig::new("memory", "bucket"),
        Arc::clone(&backend) as Arc<dyn IStorageBackend>,
    )
    .await;

    let target = dir.path().join("deep/dir/b.txt");
    assert!(client.download_file("a/b.txt", &target).await.unwrap());
    assert_eq!(std::fs::read(&target).unwrap(), b"bee");

    assert!(client.delete_file("a/b.txt").await.unwrap());
    assert!(client.list_files(None).await.unwrap().is_empty());
    assert_eq!(
        client.get_public_url("a/b.txt").await.unwrap(),
        "memory://bucket/a/b.txt"
    );
}
