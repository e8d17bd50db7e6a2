//! bucketsync providers - storage backends for remote buckets
//!
//! Provides `IStorageBackend` implementations for:
//! - Bunny.net Storage zones (HTTP storage API)
//! - Backblaze B2 buckets (native API v2)
//! - S3-compatible buckets and Linode Object Storage (via opendal)
//!
//! ## Modules
//!
//! - [`bunny`] - Bunny.net storage API backend
//! - [`b2`] - Backblaze B2 native API backend
//! - [`s3`] - S3-compatible and Linode backend
//! - [`credentials`] - Environment and keyring secret sources, credential injection
//! - [`local`] - Atomic local file writes shared by downloads

pub mod b2;
pub mod bunny;
pub mod credentials;
pub mod local;
pub mod s3;

use std::sync::Arc;

use bucketsync_core::config::BucketConfig;
use bucketsync_core::ports::{IStorageBackend, ProviderRegistry};
use thiserror::Error;

pub use b2::B2Backend;
pub use bunny::{BunnyBackend, PurgeReport};
pub use credentials::{resolve_credentials, TokenManager};
pub use s3::{S3Backend, S3Flavor};

/// Errors raised while constructing or talking to a storage provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A required credential is neither configured nor stored
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// A provider setting has an unusable value
    #[error("Invalid setting '{key}': {message}")]
    InvalidSetting {
        /// Setting name
        key: String,
        /// What is wrong with it
        message: String,
    },

    /// The provider rejected the credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The bucket, zone or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider answered with an unexpected HTTP status
    #[error("Unexpected HTTP status {status}: {message}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body or context
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// An opendal operation failed
    #[error("Storage error: {0}")]
    StorageError(#[from] opendal::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Registry with every built-in provider: `bunny`, `b2`, `s3` and `linode`.
pub fn builtin_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register("bunny", |config: &BucketConfig| {
        Ok(Arc::new(BunnyBackend::from_config(config)?) as Arc<dyn IStorageBackend>)
    });
    registry.register("b2", |config: &BucketConfig| {
        Ok(Arc::new(B2Backend::from_config(config)?) as Arc<dyn IStorageBackend>)
    });
    registry.register("s3", |config: &BucketConfig| {
        Ok(Arc::new(S3Backend::from_config(config, S3Flavor::Aws)?) as Arc<dyn IStorageBackend>)
    });
    registry.register("linode", |config: &BucketConfig| {
        Ok(Arc::new(S3Backend::from_config(config, S3Flavor::Linode)?) as Arc<dyn IStorageBackend>)
    });
    registry
}
