//! S3 backend against a mocked path-style S3 endpoint

use bucketsync_core::ports::IStorageBackend;
use tempfile::TempDir;
use wiremock::matchers::{body_bytes, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, s3_listing, s3_object, HELLO_MD5};

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_listing_strips_quoted_etags() {
    let (server, backend) = common::setup_s3_mock().await;
    Mock::given(method("GET"))
        .and(path("/media"))
        .and(query_param("list-type", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/xml")
                .set_body_string(s3_listing(&[
                    s3_object("a.txt", 5, HELLO_MD5),
                    s3_object("docs/b.txt", 3, "abc123"),
                ])),
        )
        .mount(&server)
        .await;

    let files = backend.list_remote_files(None).await.unwrap();

    assert_eq!(
        files.keys().cloned().collect::<Vec<_>>(),
        vec!["a.txt", "docs/b.txt"]
    );
    let a = &files["a.txt"];
    assert_eq!(a.size, 5);
    assert_eq!(a.checksum.as_deref(), Some(HELLO_MD5));
    assert!(a.last_modified.is_some());
    assert_eq!(files["docs/b.txt"].checksum.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_listing_failure_is_an_error() {
    let (server, backend) = common::setup_s3_mock().await;
    Mock::given(method("GET"))
        .and(path("/media"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(backend.list_remote_files(None).await.is_err());
}

// ============================================================================
// Transfers
// ============================================================================

#[tokio::test]
async fn test_upload_puts_object() {
    let (server, backend) = common::setup_s3_mock().await;
    Mock::given(method("PUT"))
        .and(path("/media/dir/new.txt"))
        .and(body_bytes(b"hello".to_vec()))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"etag\""))
        .expect(1)
        .mount(&server)
        .await;

    let local = common::local_tree(&[("new.txt", "hello")]);
    assert!(backend
        .upload_file(&local.path().join("new.txt"), "dir/new.txt")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_download_missing_returns_false() {
    let (server, backend) = common::setup_s3_mock().await;
    for verb in ["GET", "HEAD"] {
        Mock::given(method(verb))
            .and(path("/media/gone.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("gone.txt");
    assert!(!backend.download_file("gone.txt", &target).await.unwrap());
    assert!(!target.exists());
}

#[tokio::test]
async fn test_delete_removes_object() {
    let (server, backend) = common::setup_s3_mock().await;
    Mock::given(method("DELETE"))
        .and(path("/media/old.txt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    assert!(backend.delete_file("old.txt").await.unwrap());
}

#[tokio::test]
async fn test_public_url_uses_endpoint_and_bucket() {
    let (server, backend) = common::setup_s3_mock().await;
    assert_eq!(
        backend.get_public_url("img/a.png").await.unwrap(),
        format!("{}/media/img/a.png", server.uri())
    );
}
