//! Backblaze B2 backend against a mocked native API

use bucketsync_core::ports::IStorageBackend;
use bucketsync_providers::B2Backend;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, b2_file, B2_TOKEN, HELLO_SHA1};

// ============================================================================
// Authorisation
// ============================================================================

#[tokio::test]
async fn test_connect_authorises_and_finds_bucket() {
    let (_server, backend) = common::setup_b2_mock().await;
    assert!(backend.connect().await.unwrap());

    let report = backend.test_connection().await.unwrap();
    assert_eq!(
        report.checks,
        vec![
            ("b2_auth".to_string(), Some(true)),
            ("bucket_access".to_string(), Some(true)),
        ]
    );
}

#[tokio::test]
async fn test_connect_refused_with_bad_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/b2api/v2/b2_authorize_account"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let backend = B2Backend::with_api_url("bucket", "id", "wrong", &server.uri());

    assert!(!backend.connect().await.unwrap());
    assert!(!backend.test_connection().await.unwrap().is_connected());
}

#[tokio::test]
async fn test_unknown_bucket_is_refused() {
    let (server, _) = common::setup_b2_mock().await;
    let backend = B2Backend::with_api_url("other", "key-id", "app-key", &server.uri());
    assert!(!backend.connect().await.unwrap());
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_listing_follows_pages_and_skips_hidden_versions() {
    let (server, backend) = common::setup_b2_mock().await;

    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_list_file_names"))
        .and(body_partial_json(json!({ "startFileName": "m.txt" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [b2_file("m.txt", 2, "none"), b2_file("z/last.txt", 4, "abc")],
            "nextFileName": null
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    let mut hidden = b2_file("hidden.txt", 0, "none");
    hidden["action"] = json!("hide");
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_list_file_names"))
        .and(header("Authorization", B2_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [b2_file("a.txt", 5, HELLO_SHA1), hidden, b2_file("folder/", 0, "none")],
            "nextFileName": "m.txt"
        })))
        .mount(&server)
        .await;

    let files = backend.list_remote_files(None).await.unwrap();

    assert_eq!(
        files.keys().cloned().collect::<Vec<_>>(),
        vec!["a.txt", "m.txt", "z/last.txt"]
    );
    assert_eq!(files["a.txt"].checksum.as_deref(), Some(HELLO_SHA1));
    assert_eq!(files["a.txt"].provider_id.as_deref(), Some("id-a.txt"));
    assert_eq!(files["m.txt"].checksum, None);
    assert_eq!(files["z/last.txt"].name, "last.txt");
    assert!(files["a.txt"].last_modified.is_some());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() {
    let (server, backend) = common::setup_b2_mock().await;

    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_list_file_names"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_list_file_names"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [b2_file("a.txt", 5, HELLO_SHA1)],
            "nextFileName": null
        })))
        .mount(&server)
        .await;

    let files = backend.list_remote_files(None).await.unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_listing_failure_is_an_error() {
    let (server, backend) = common::setup_b2_mock().await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_list_file_names"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    assert!(backend.list_remote_files(None).await.is_err());
}

// ============================================================================
// Transfers
// ============================================================================

#[tokio::test]
async fn test_upload_sends_name_and_sha1() {
    let (server, backend) = common::setup_b2_mock().await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_get_upload_url"))
        .and(body_partial_json(json!({ "bucketId": "bucket-id" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/upload/bucket-id", server.uri()),
            "authorizationToken": "upload-token"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/bucket-id"))
        .and(header("Authorization", "upload-token"))
        .and(header("X-Bz-File-Name", "dir/new%20file.txt"))
        .and(header("X-Bz-Content-Sha1", HELLO_SHA1))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fileId": "f1" })))
        .expect(1)
        .mount(&server)
        .await;

    let local = common::local_tree(&[("new file.txt", "hello")]);
    assert!(backend
        .upload_file(&local.path().join("new file.txt"), "dir/new file.txt")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_download_by_name() {
    let (server, backend) = common::setup_b2_mock().await;
    Mock::given(method("GET"))
        .and(path("/file/bucket/docs/a.txt"))
        .and(header("Authorization", B2_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"content".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file/bucket/missing.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nested/a.txt");
    assert!(backend.download_file("docs/a.txt", &target).await.unwrap());
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "content");

    assert!(!backend
        .download_file("missing.txt", &dir.path().join("missing.txt"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_delete_removes_latest_version() {
    let (server, backend) = common::setup_b2_mock().await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_list_file_names"))
        .and(body_partial_json(json!({ "prefix": "a.txt", "maxFileCount": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [b2_file("a.txt", 5, HELLO_SHA1)],
            "nextFileName": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_delete_file_version"))
        .and(body_partial_json(json!({ "fileName": "a.txt", "fileId": "id-a.txt" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(backend.delete_file("a.txt").await.unwrap());
}

#[tokio::test]
async fn test_delete_absent_file_succeeds() {
    let (server, backend) = common::setup_b2_mock().await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_list_file_names"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [b2_file("b.txt", 1, "x")],
            "nextFileName": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_delete_file_version"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(backend.delete_file("a.txt").await.unwrap());
}

#[tokio::test]
async fn test_public_url_uses_download_host() {
    let (server, backend) = common::setup_b2_mock().await;
    assert_eq!(
        backend.get_public_url("img/a b.png").await.unwrap(),
        format!("{}/file/bucket/img/a%20b.png", server.uri())
    );
}
