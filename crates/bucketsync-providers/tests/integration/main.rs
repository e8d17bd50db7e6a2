//! Integration tests for bucketsync-providers
//!
//! Uses wiremock to simulate the Bunny.net storage API, the Backblaze B2
//! native API and a path-style S3 endpoint, and drives full sync runs
//! through the real backends.

mod common;

mod test_b2;
mod test_s3;
