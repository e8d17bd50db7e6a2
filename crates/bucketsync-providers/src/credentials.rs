//! Credential sources and injection
//!
//! Tokens are stored per *context* (a bucket name or provider name). Lookup
//! order is the environment first, then the system keyring:
//!
//! - [`EnvSecretSource`] - `bucketsync_<namespace>_<context>` for the token and
//!   `bucketsync_<namespace>_<context>_id` for the token id, tried verbatim and
//!   then upper-cased
//! - [`KeyringSecretSource`] - service `bucketsync_<namespace>_<context>`,
//!   users `api_token` and `token_id`
//! - [`ChainedSecretSource`] - first source with a value wins
//!
//! [`resolve_credentials`] copies the found secrets into the provider-specific
//! credential keys of a [`BucketConfig`] before any backend is constructed.

use anyhow::{Context, Result};
use bucketsync_core::config::BucketConfig;
use bucketsync_core::ports::{ISecretSource, SecretKind};
use tracing::{debug, info};

/// Default namespace for stored tokens
pub const DEFAULT_NAMESPACE: &str = "bucketsync";

const ENV_PREFIX: &str = "bucketsync";
const KEYRING_TOKEN_USER: &str = "api_token";
const KEYRING_TOKEN_ID_USER: &str = "token_id";

fn qualified_name(namespace: &str, context: &str) -> String {
    format!("{ENV_PREFIX}_{namespace}_{context}")
}

// ============================================================================
// EnvSecretSource
// ============================================================================

/// Secrets from environment variables.
#[derive(Debug, Clone)]
pub struct EnvSecretSource {
    namespace: String,
}

impl EnvSecretSource {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Variable name consulted first for a secret.
    pub fn variable_name(&self, context: &str, kind: SecretKind) -> String {
        let base = qualified_name(&self.namespace, context);
        match kind {
            SecretKind::Token => base,
            SecretKind::TokenId => format!("{base}_id"),
        }
    }
}

impl Default for EnvSecretSource {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl ISecretSource for EnvSecretSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get_secret(&self, context: &str, kind: SecretKind) -> Result<Option<String>> {
        let name = self.variable_name(context, kind);
        for candidate in [name.clone(), name.to_uppercase()] {
            if let Ok(value) = std::env::var(&candidate) {
                debug!(variable = %candidate, "Using {kind} from environment variable");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn set_secret(&self, _context: &str, _kind: SecretKind, _value: &str) -> Result<()> {
        anyhow::bail!("environment variables cannot be written; use the keyring")
    }

    fn delete_secret(&self, _context: &str, _kind: SecretKind) -> Result<()> {
        anyhow::bail!("environment variables cannot be removed; unset them in the shell")
    }
}

// ============================================================================
// KeyringSecretSource
// ============================================================================

/// Secrets stored in the system keyring (Secret Service, macOS Keychain, ...).
#[derive(Debug, Clone)]
pub struct KeyringSecretSource {
    namespace: String,
}

impl KeyringSecretSource {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn entry(&self, context: &str, kind: SecretKind) -> Result<keyring::Entry> {
        let user = match kind {
            SecretKind::Token => KEYRING_TOKEN_USER,
            SecretKind::TokenId => KEYRING_TOKEN_ID_USER,
        };
        keyring::Entry::new(&qualified_name(&self.namespace, context), user)
            .context("Failed to create keyring entry")
    }
}

impl Default for KeyringSecretSource {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl ISecretSource for KeyringSecretSource {
    fn name(&self) -> &str {
        "keyring"
    }

    fn get_secret(&self, context: &str, kind: SecretKind) -> Result<Option<String>> {
        match self.entry(context, kind)?.get_password() {
            Ok(secret) => {
                debug!(context = %context, "Loaded {kind} from keyring");
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(context = %context, "No {kind} found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn set_secret(&self, context: &str, kind: SecretKind, value: &str) -> Result<()> {
        self.entry(context, kind)?
            .set_password(value)
            .context("Failed to store secret in keyring")?;
        info!(context = %context, "Stored {kind} in keyring");
        Ok(())
    }

    fn delete_secret(&self, context: &str, kind: SecretKind) -> Result<()> {
        match self.entry(context, kind)?.delete_credential() {
            Ok(()) => {
                info!(context = %context, "Removed {kind} from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(context = %context, "No {kind} to remove");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// ChainedSecretSource
// ============================================================================

/// Tries each source in order; writes go to the last source.
pub struct ChainedSecretSource {
    sources: Vec<Box<dyn ISecretSource>>,
}

impl ChainedSecretSource {
    pub fn new(sources: Vec<Box<dyn ISecretSource>>) -> Self {
        Self { sources }
    }

    fn writable(&self) -> Result<&dyn ISecretSource> {
        self.sources
            .last()
            .map(|source| source.as_ref())
            .context("no secret source configured")
    }
}

impl ISecretSource for ChainedSecretSource {
    fn name(&self) -> &str {
        "chained"
    }

    fn get_secret(&self, context: &str, kind: SecretKind) -> Result<Option<String>> {
        for source in &self.sources {
            if let Some(secret) = source.get_secret(context, kind)? {
                return Ok(Some(secret));
            }
        }
        Ok(None)
    }

    fn set_secret(&self, context: &str, kind: SecretKind, value: &str) -> Result<()> {
        self.writable()?.set_secret(context, kind, value)
    }

    fn delete_secret(&self, context: &str, kind: SecretKind) -> Result<()> {
        self.writable()?.delete_secret(context, kind)
    }
}

// ============================================================================
// TokenManager
// ============================================================================

/// Environment-then-keyring token store for one namespace.
pub struct TokenManager {
    source: ChainedSecretSource,
}

impl TokenManager {
    pub fn new(namespace: &str) -> Self {
        Self {
            source: ChainedSecretSource::new(vec![
                Box::new(EnvSecretSource::new(namespace)),
                Box::new(KeyringSecretSource::new(namespace)),
            ]),
        }
    }

    pub fn source(&self) -> &dyn ISecretSource {
        &self.source
    }

    pub fn get_token(&self, context: &str) -> Result<Option<String>> {
        self.source.get_secret(context, SecretKind::Token)
    }

    pub fn get_token_id(&self, context: &str) -> Result<Option<String>> {
        self.source.get_secret(context, SecretKind::TokenId)
    }

    pub fn save_token(&self, context: &str, token: &str) -> Result<()> {
        self.source.set_secret(context, SecretKind::Token, token)
    }

    pub fn save_token_id(&self, context: &str, token_id: &str) -> Result<()> {
        self.source.set_secret(context, SecretKind::TokenId, token_id)
    }

    /// Remove both the token and the token id.
    pub fn delete(&self, context: &str) -> Result<()> {
        self.source.delete_secret(context, SecretKind::Token)?;
        self.source.delete_secret(context, SecretKind::TokenId)
    }
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

// ============================================================================
// Credential injection
// ============================================================================

/// Credential keys a provider reads its `(token id, token)` pair from.
pub fn credential_keys(provider: &str) -> (&'static str, &'static str) {
    match provider.to_ascii_lowercase().as_str() {
        "b2" => ("application_key_id", "application_key"),
        "s3" | "linode" => ("access_key_id", "secret_access_key"),
        _ => ("token_id", "api_key"),
    }
}

/// Fill missing credentials in `config` from `source`, using the config's
/// token context. Credentials already present are left untouched.
pub fn resolve_credentials(config: &mut BucketConfig, source: &dyn ISecretSource) -> Result<()> {
    let context = config.effective_token_context().to_string();
    let (id_key, token_key) = credential_keys(&config.provider);

    for (key, kind) in [(token_key, SecretKind::Token), (id_key, SecretKind::TokenId)] {
        if config.credential(key).is_some() {
            continue;
        }
        if let Some(secret) = source.get_secret(&context, kind)? {
            debug!(context = %context, key = %key, source = source.name(), "Resolved credential");
            config.credentials.insert(key.to_string(), secret);
        }
    }
    Ok(())
}
