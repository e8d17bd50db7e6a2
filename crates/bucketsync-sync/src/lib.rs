//! bucketsync sync - one-shot bucket synchronization engine
//!
//! Provides:
//! - Content digests of local files (sha256, md5, sha1)
//! - A local tree scanner with optional sub-path scope
//! - A diff engine classifying paths into upload, download and delete lists
//! - A bounded-concurrency execution engine with per-item failure tolerance
//!
//! ## Modules
//!
//! - [`checksum`] - Streaming file digests
//! - [`scanner`] - Local tree scanner producing a `FileDigestMap`
//! - [`filter`] - Include/exclude regex filters
//! - [`planner`] - Diff engine producing a `SyncPlan`
//! - [`executor`] - Execution engine running a `SyncPlan` against a backend
//! - [`engine`] - `SyncEngine` wiring the stages together
//! - [`client`] - `BucketClient` facade over a configured backend

pub mod checksum;
pub mod client;
pub mod engine;
pub mod executor;
pub mod filter;
pub mod planner;
pub mod scanner;

pub use client::{BucketClient, SyncOptions};
pub use engine::{SyncEngine, SyncRequest};

use std::path::PathBuf;

use bucketsync_core::config::ValidationError;
use thiserror::Error;

/// Errors that abort a sync run before any transfer is attempted
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The local sync root does not exist or is not a directory
    #[error("Local path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// An include or exclude pattern is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The remote listing could not be obtained
    #[error("Failed to list remote files: {0}")]
    RemoteListing(String),

    /// The bucket configuration failed validation
    #[error("Invalid configuration: {}", format_validation_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    /// The storage backend could not be constructed
    #[error("Backend error: {0}")]
    Backend(String),

    /// A background scan task panicked or was cancelled
    #[error("Task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    /// A domain-level error propagated from bucketsync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] bucketsync_core::domain::errors::DomainError),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
