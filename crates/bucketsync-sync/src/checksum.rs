//! Streaming file digests
//!
//! Files are read in fixed-size blocks so hashing a large file never holds
//! it in memory. A file that cannot be read yields an empty digest, which
//! never equals a provider checksum and therefore always re-uploads.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use bucketsync_core::domain::ChecksumAlgorithm;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{error, warn};

/// Read buffer size used while hashing.
const BLOCK_SIZE: usize = 64 * 1024;

/// Resolve a configured algorithm name, falling back to sha256 with a
/// warning when the name is unknown.
pub fn resolve_algorithm(name: &str) -> ChecksumAlgorithm {
    ChecksumAlgorithm::parse(name).unwrap_or_else(|| {
        warn!(algorithm = %name, "Unsupported checksum algorithm, using sha256");
        ChecksumAlgorithm::Sha256
    })
}

/// Lowercase hex digest of the file at `path`, or `""` when it cannot be read.
pub fn digest(path: &Path, algorithm: ChecksumAlgorithm) -> String {
    match try_digest(path, algorithm) {
        Ok(hex) => hex,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to calculate checksum");
            String::new()
        }
    }
}

/// Like [`digest`] but surfaces the I/O error.
pub fn try_digest(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    match algorithm {
        ChecksumAlgorithm::Sha256 => hash_reader::<Sha256, _>(file),
        ChecksumAlgorithm::Md5 => hash_reader::<Md5, _>(file),
        ChecksumAlgorithm::Sha1 => hash_reader::<Sha1, _>(file),
    }
}

fn hash_reader<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
