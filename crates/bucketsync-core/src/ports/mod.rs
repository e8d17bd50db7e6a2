//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The sync engine depends on these interfaces;
//! their implementations live in the providers crate.
//!
//! ## Ports Overview
//!
//! - [`IStorageBackend`] - Object operations against one remote bucket
//! - [`ISecretSource`] - Credential lookup (environment, system keyring)
//! - [`ProviderRegistry`] - Explicit provider name → backend constructor map

pub mod registry;
pub mod secret_source;
pub mod storage_backend;

pub use registry::{BackendFactory, ProviderRegistry};
pub use secret_source::{ISecretSource, SecretKind};
pub use storage_backend::{ConnectionReport, IStorageBackend, ProgressCallback};
