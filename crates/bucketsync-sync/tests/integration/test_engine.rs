//! End-to-end behaviour of `SyncEngine`

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bucketsync_core::domain::ChecksumAlgorithm;
use bucketsync_core::ports::IStorageBackend;
use bucketsync_sync::{SyncEngine, SyncError, SyncRequest};

use crate::common::{local_tree, MemoryBackend};

fn engine(backend: &Arc<MemoryBackend>) -> SyncEngine {
    SyncEngine::new(
        Arc::clone(backend) as Arc<dyn IStorageBackend>,
        ChecksumAlgorithm::Sha256,
    )
}

#[tokio::test]
async fn second_sync_is_a_no_op() {
    let dir = local_tree(&[("a.txt", "alpha"), ("docs/b.md", "bravo"), ("docs/c.md", "charlie")]);
    let backend = Arc::new(MemoryBackend::new());
    let engine = engine(&backend);

    let first = engine
        .sync(dir.path(), &SyncRequest::default(), None)
        .await
        .unwrap();
    assert!(first.success);
    assert_eq!(first.uploaded, 3);

    let transfers = backend.transfer_count();
    let second = engine
        .sync(dir.path(), &SyncRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(second.uploaded, 0);
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(backend.transfer_count(), transfers);
}

#[tokio::test]
async fn modified_file_is_uploaded_again() {
    let dir = local_tree(&[("a.txt", "v1")]);
    let backend = Arc::new(MemoryBackend::new());
    let engine = engine(&backend);
    engine.sync(dir.path(), &SyncRequest::default(), None).await.unwrap();

    std::fs::write(dir.path().join("a.txt"), "v2").unwrap();
    let result = engine.sync(dir.path(), &SyncRequest::default(), None).await.unwrap();
    assert_eq!(result.uploaded, 1);
    assert_eq!(backend.get("a.txt").unwrap(), b"v2");
}

#[tokio::test]
async fn dry_run_changes_nothing_and_is_repeatable() {
    let dir = local_tree(&[("new.txt", "new")]);
    let backend = Arc::new(MemoryBackend::new());
    backend.put("remote-only/r.txt", b"remote");
    backend.put("orphan.txt", b"orphan");
    let engine = engine(&backend);
    let request = SyncRequest {
        dry_run: true,
        ..SyncRequest::default()
    };

    for _ in 0..2 {
        let result = engine.sync(dir.path(), &request, None).await.unwrap();
        assert!(result.success);
        assert_eq!(result.uploaded, 1);
        assert_eq!(result.downloaded, 2);
    }
    assert_eq!(backend.transfer_count(), 0);
    assert_eq!(backend.paths(), vec!["orphan.txt", "remote-only/r.txt"]);
    assert!(!dir.path().join("remote-only").exists());
}

#[tokio::test]
async fn orphan_handling_follows_delete_policy() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put("a.txt", b"same");
    backend.put("b.txt", b"orphan");
    let engine = engine(&backend);

    let dir = local_tree(&[("a.txt", "same")]);
    let dry = SyncRequest {
        dry_run: true,
        ..SyncRequest::default()
    };
    let keep = engine.sync(dir.path(), &dry, None).await.unwrap();
    assert_eq!((keep.uploaded, keep.unchanged, keep.deleted), (0, 1, 0));

    let prune = SyncRequest {
        delete_orphaned: true,
        ..SyncRequest::default()
    };
    let result = engine.sync(dir.path(), &prune, None).await.unwrap();
    assert_eq!((result.uploaded, result.unchanged, result.deleted), (0, 1, 1));
    assert_eq!(result.downloaded, 0);
    assert_eq!(backend.paths(), vec!["a.txt"]);
    assert!(!dir.path().join("b.txt").exists());
}

#[tokio::test]
async fn restore_downloads_into_nested_directories() {
    let dir = local_tree(&[]);
    let backend = Arc::new(MemoryBackend::new());
    backend.put("site/css/main.css", b"body{}");
    backend.put("site/js/app.js", b"run()");

    let result = engine(&backend)
        .sync(dir.path(), &SyncRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(result.downloaded, 2);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("site/css/main.css")).unwrap(),
        "body{}"
    );
    assert!(dir.path().join("site/js/app.js").is_file());
}

#[tokio::test]
async fn scoped_deletion_leaves_other_prefixes_alone() {
    let dir = local_tree(&[("docs/keep.txt", "keep")]);
    let backend = Arc::new(MemoryBackend::new());
    backend.put("images/x.png", b"png");
    backend.put("docs/old.txt", b"old");
    let request = SyncRequest {
        delete_orphaned: true,
        sync_paths: vec!["docs".into()],
        ..SyncRequest::default()
    };

    let result = engine(&backend).sync(dir.path(), &request, None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.uploaded, 1);
    assert_eq!(result.deleted, 1);
    assert_eq!(result.protected_skipped, 1);
    assert_eq!(result.downloaded, 0);
    assert_eq!(backend.paths(), vec!["docs/keep.txt", "images/x.png"]);
}

#[tokio::test]
async fn scoped_deletion_still_counts_protected_orphans() {
    let dir = local_tree(&[]);
    std::fs::create_dir_all(dir.path().join("docs")).unwrap();
    let backend = Arc::new(MemoryBackend::new());
    backend.put("docs/old.txt", b"old");
    backend.put("images/x.png", b"png");
    let request = SyncRequest {
        delete_orphaned: true,
        sync_paths: vec!["docs".into()],
        ..SyncRequest::default()
    };

    let result = engine(&backend).sync(dir.path(), &request, None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.deleted, 1);
    assert_eq!(result.protected_skipped, 1);
    assert_eq!(result.downloaded, 0);
    assert!(!dir.path().join("docs/old.txt").exists());
    assert_eq!(backend.paths(), vec!["images/x.png"]);
}

#[tokio::test]
async fn scoped_sync_protects_local_paths_from_downloads() {
    let dir = local_tree(&[("docs/local.txt", "local")]);
    let backend = Arc::new(MemoryBackend::new());
    backend.put("docs/remote-a.txt", b"a");
    backend.put("docs/remote-b.txt", b"b");
    backend.put("images/x.png", b"png");
    let request = SyncRequest {
        sync_paths: vec!["docs".into()],
        ..SyncRequest::default()
    };

    let result = engine(&backend).sync(dir.path(), &request, None).await.unwrap();
    assert_eq!(result.protected_skipped, 2);
    assert_eq!(result.downloaded, 0);
    assert_eq!(result.uploaded, 1);
    assert!(!dir.path().join("docs/remote-a.txt").exists());
    assert!(!dir.path().join("images").exists());
}

#[tokio::test]
async fn failures_partition_every_planned_operation() {
    let dir = local_tree(&[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")]);
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_on("b.txt");

    let result = engine(&backend)
        .sync(dir.path(), &SyncRequest::default(), None)
        .await
        .unwrap();
    assert_eq!(result.uploaded, 2);
    assert_eq!(result.failed, 1);
    assert!(!result.success);
    assert_eq!(result.errors, vec!["Error uploading b.txt: simulated failure"]);
}

#[tokio::test]
async fn include_and_exclude_patterns_filter_both_sides() {
    let dir = local_tree(&[("notes.md", "n"), ("build.log", "l"), ("draft.md", "d")]);
    let backend = Arc::new(MemoryBackend::new());
    backend.put("remote.md", b"r");
    backend.put("remote.bin", b"b");
    let request = SyncRequest {
        include_pattern: Some(r"\.md$".into()),
        exclude_pattern: Some("^draft".into()),
        ..SyncRequest::default()
    };

    let result = engine(&backend).sync(dir.path(), &request, None).await.unwrap();
    assert_eq!(result.uploaded, 1);
    assert_eq!(result.downloaded, 1);
    assert!(backend.get("notes.md").is_some());
    assert!(backend.get("build.log").is_none());
    assert!(backend.get("draft.md").is_none());
    assert!(!dir.path().join("remote.bin").exists());
}

#[tokio::test]
async fn listing_failure_aborts_before_any_transfer() {
    let dir = local_tree(&[("a.txt", "a")]);
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_listing.store(true, Ordering::SeqCst);

    let err = engine(&backend)
        .sync(dir.path(), &SyncRequest::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::RemoteListing(ref msg) if msg.contains("listing timed out")));
    assert_eq!(backend.transfer_count(), 0);
}

#[tokio::test]
async fn missing_root_is_rejected() {
    let dir = local_tree(&[]);
    let missing = dir.path().join("nope");
    let backend = Arc::new(MemoryBackend::new());

    let err = engine(&backend)
        .sync(&missing, &SyncRequest::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::PathNotFound(ref p) if *p == missing));
}

#[tokio::test]
async fn invalid_pattern_is_rejected() {
    let dir = local_tree(&[]);
    let backend = Arc::new(MemoryBackend::new());
    let request = SyncRequest {
        exclude_pattern: Some("[".into()),
        ..SyncRequest::default()
    };

    let err = engine(&backend).sync(dir.path(), &request, None).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidPattern { .. }));
}
