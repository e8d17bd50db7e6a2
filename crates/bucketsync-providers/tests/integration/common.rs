//! Shared wiremock setup for provider tests

use std::path::Path;

use bucketsync_core::config::BucketConfig;
use bucketsync_providers::{B2Backend, BunnyBackend, S3Backend, S3Flavor};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// sha256 of `hello`
pub const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

/// sha1 of `hello`
pub const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

pub const BUNNY_KEY: &str = "zone-key";

/// Starts a mock server and returns a Bunny backend for storage zone `zone`.
pub async fn setup_bunny_mock() -> (MockServer, BunnyBackend) {
    let server = MockServer::start().await;
    let backend = BunnyBackend::with_base_url("zone", BUNNY_KEY, &server.uri())
        .expect("valid mock server URL");
    (server, backend)
}

/// Mounts a directory listing for `dir` (`/zone/` for the root).
pub async fn mount_bunny_listing(server: &MockServer, dir: &str, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(dir))
        .and(header("AccessKey", BUNNY_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

/// A file entry as the Bunny listing API reports it.
pub fn bunny_file(name: &str, length: u64, checksum: &str) -> serde_json::Value {
    json!({
        "Guid": format!("guid-{name}"),
        "ObjectName": name,
        "IsDirectory": false,
        "Length": length,
        "LastChanged": "2024-05-01T08:30:00.000",
        "Checksum": checksum
    })
}

/// A directory entry as the Bunny listing API reports it.
pub fn bunny_dir(name: &str) -> serde_json::Value {
    json!({
        "Guid": format!("guid-{name}"),
        "ObjectName": name,
        "IsDirectory": true,
        "Length": 0,
        "LastChanged": "2024-05-01T08:30:00.000",
        "Checksum": null
    })
}

pub const B2_TOKEN: &str = "account-token";

/// Starts a mock server answering authorisation and bucket lookup for
/// bucket `bucket` (id `bucket-id`), and returns a B2 backend using it.
pub async fn setup_b2_mock() -> (MockServer, B2Backend) {
    let server = MockServer::start().await;
    mount_b2_auth(&server).await;
    let backend = B2Backend::with_api_url("bucket", "key-id", "app-key", &server.uri());
    (server, backend)
}

pub async fn mount_b2_auth(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/b2api/v2/b2_authorize_account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountId": "account",
            "authorizationToken": B2_TOKEN,
            "apiUrl": server.uri(),
            "downloadUrl": server.uri()
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_list_buckets"))
        .and(header("Authorization", B2_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "buckets": [{ "bucketId": "bucket-id", "bucketName": "bucket" }]
        })))
        .mount(server)
        .await;
}

/// A file version as `b2_list_file_names` reports it.
pub fn b2_file(name: &str, length: u64, sha1: &str) -> serde_json::Value {
    json!({
        "fileName": name,
        "fileId": format!("id-{name}"),
        "contentLength": length,
        "contentSha1": sha1,
        "action": "upload",
        "uploadTimestamp": 1_714_552_200_000_i64
    })
}

/// md5 of `hello`, the ETag S3 reports for a single-part upload
pub const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

/// Starts a mock server and returns an S3 backend for bucket `media`
/// using it as a path-style endpoint.
pub async fn setup_s3_mock() -> (MockServer, S3Backend) {
    let server = MockServer::start().await;
    let mut config = BucketConfig::new("s3", "media");
    config.region = Some("us-east-1".into());
    config
        .credentials
        .insert("access_key_id".into(), "AKIAMOCK".into());
    config
        .credentials
        .insert("secret_access_key".into(), "mock-secret".into());
    config
        .provider_settings
        .insert("endpoint".into(), serde_yaml::Value::from(server.uri()));
    let backend = S3Backend::from_config(&config, S3Flavor::Aws).expect("valid S3 config");
    (server, backend)
}

/// One `<Contents>` element of a ListObjectsV2 response.
pub fn s3_object(key: &str, size: u64, etag: &str) -> String {
    format!(
        "<Contents><Key>{key}</Key><LastModified>2024-05-01T08:30:00.000Z</LastModified>\
         <ETag>&quot;{etag}&quot;</ETag><Size>{size}</Size>\
         <StorageClass>STANDARD</StorageClass></Contents>"
    )
}

/// Wraps `contents` in a complete, untruncated ListObjectsV2 body.
pub fn s3_listing(contents: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
         <Name>media</Name><Prefix></Prefix><KeyCount>{}</KeyCount>\
         <MaxKeys>1000</MaxKeys><IsTruncated>false</IsTruncated>{}</ListBucketResult>",
        contents.len(),
        contents.concat()
    )
}

/// Creates a temporary directory holding `files` (relative path, content).
pub fn local_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (rel, content) in files {
        write(dir.path(), rel, content);
    }
    dir
}

fn write(root: &Path, rel: &str, content: &str) {
    let target = root.join(rel);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(target, content).expect("write file");
}
