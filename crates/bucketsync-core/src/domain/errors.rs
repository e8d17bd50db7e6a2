//! Domain error types
//!
//! Errors raised while building or validating domain values: configuration
//! problems, unknown providers and malformed paths.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// No backend is registered under the requested provider name
    #[error("Unsupported provider: {0}")]
    UnknownProvider(String),

    /// A configuration file or value could not be interpreted
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
