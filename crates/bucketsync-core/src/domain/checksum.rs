//! Content digest algorithms

use std::fmt;

use serde::{Deserialize, Serialize};

/// Digest algorithm used to fingerprint local files.
///
/// The engine compares these digests with the checksum string a provider
/// reports for each object, so the choice only pays off when it matches
/// what the provider computes (sha256 for Bunny.net, sha1 for B2, md5-style
/// ETags for most S3 uploads).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Md5,
    Sha1,
}

impl ChecksumAlgorithm {
    pub const ALL: [ChecksumAlgorithm; 3] = [Self::Sha256, Self::Md5, Self::Sha1];

    /// Parse an algorithm name, case-insensitively.
    ///
    /// Returns `None` for names the engine does not implement; callers
    /// decide how to fall back.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "md5" => Some(Self::Md5),
            "sha1" => Some(Self::Sha1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
