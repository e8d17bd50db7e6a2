//! Secret source port
//!
//! Credentials are resolved outside the sync engine: the CLI (or any other
//! caller) asks a secret source for the token stored under a context name
//! and injects it into the `BucketConfig` before constructing a backend.

use std::fmt;

/// Which of the two secrets stored per context is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    /// The API key, application key or secret access key
    Token,
    /// The identifier paired with the token (B2 key id, S3 access key id)
    TokenId,
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => f.write_str("token"),
            Self::TokenId => f.write_str("token id"),
        }
    }
}

/// Lookup and storage of per-context secrets.
pub trait ISecretSource: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Fetch a secret. `Ok(None)` means nothing is stored.
    fn get_secret(&self, context: &str, kind: SecretKind) -> anyhow::Result<Option<String>>;

    /// Store a secret, replacing any previous value.
    fn set_secret(&self, context: &str, kind: SecretKind, value: &str) -> anyhow::Result<()>;

    /// Remove a secret. Removing an absent secret is not an error.
    fn delete_secret(&self, context: &str, kind: SecretKind) -> anyhow::Result<()>;
}
