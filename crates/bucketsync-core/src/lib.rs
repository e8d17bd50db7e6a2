//! bucketsync core - domain types, configuration and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `FileDigestMap`, `RemoteFileRecord`, `SyncPlan`, `SyncResult`
//! - **Configuration** - `BucketConfig` and multi-bucket `BucketConfigSet` files
//! - **Port definitions** - `IStorageBackend`, `ISecretSource`, `ProviderRegistry`
//!
//! # Architecture
//!
//! The domain module holds plain data and pure helpers with no I/O.
//! Ports define the trait interfaces that provider crates implement, so
//! the sync engine never depends on a concrete storage service.

pub mod config;
pub mod domain;
pub mod ports;
