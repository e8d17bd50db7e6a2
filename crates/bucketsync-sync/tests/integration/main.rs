//! Integration tests for the sync engine against an in-memory bucket
//!
//! These tests exercise the full scan → list → plan → execute pipeline
//! through `SyncEngine` and `BucketClient`, with real temporary directories
//! on the local side.

mod common;
mod test_client;
mod test_engine;
