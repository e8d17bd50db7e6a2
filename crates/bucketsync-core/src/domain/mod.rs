//! Domain types for bucket synchronization
//!
//! This module contains the plain data the sync pipeline passes around:
//! - Content digest algorithms
//! - Local and remote file maps
//! - Sync plans and their execution results
//! - Path normalization and scope helpers
//! - Domain-specific error types

pub mod checksum;
pub mod errors;
pub mod paths;
pub mod plan;
pub mod remote;
pub mod result;

// Re-export commonly used types
pub use checksum::ChecksumAlgorithm;
pub use errors::DomainError;
pub use paths::{normalize_relative, ProtectedPaths, ScopePaths, PARTIAL_DOWNLOAD_SUFFIX};
pub use plan::{SyncAction, SyncPlan};
pub use remote::{FileDigestMap, RemoteFileMap, RemoteFileRecord};
pub use result::SyncResult;
