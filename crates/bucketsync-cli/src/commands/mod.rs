//! CLI subcommands and the shared context they run in

pub mod completions;
pub mod init;
pub mod ls;
pub mod purge;
pub mod status;
pub mod sync;
pub mod token;
pub mod url;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bucketsync_core::config::{BucketConfig, BucketConfigSet, DEFAULT_CONFIG_FILE};
use bucketsync_providers::{builtin_registry, resolve_credentials, TokenManager};
use bucketsync_sync::BucketClient;
use tracing::{debug, warn};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global options every subcommand sees
#[derive(Debug, Clone)]
pub struct CliContext {
    pub directory: PathBuf,
    pub config: Option<PathBuf>,
    pub bucket: Option<String>,
    pub quiet: bool,
    pub format: OutputFormat,
}

impl CliContext {
    /// `--config`, else `<directory>/.bucketsync`.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.directory.join(DEFAULT_CONFIG_FILE))
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Load the bucket configuration and fill credentials from the
    /// environment and the keyring.
    pub fn load_config(&self) -> Result<BucketConfig> {
        let path = self.config_path();
        if !path.exists() {
            anyhow::bail!(
                "Configuration file not found: {}. Run 'bucketsync init' first.",
                path.display()
            );
        }

        let mut config = match &self.bucket {
            Some(name) => BucketConfigSet::from_file(&path)?
                .get(name)
                .cloned()
                .with_context(|| format!("Bucket '{name}' not found in {}", path.display()))?,
            None => BucketConfig::from_file(&path)?,
        };
        debug!(config = %path.display(), provider = %config.provider, "Loaded configuration");

        let tokens = TokenManager::default();
        if let Err(e) = resolve_credentials(&mut config, tokens.source()) {
            warn!(error = %e, "Could not read stored credentials");
        }
        Ok(config)
    }

    /// Load the configuration and connect to its bucket.
    pub async fn connect(&self) -> Result<BucketClient> {
        let config = self.load_config()?;
        let client = BucketClient::new(config, &builtin_registry()).await?;
        Ok(client)
    }
}

/// Returns the command's own outcome; a failure to close the backend is
/// only logged.
pub fn after_close<T, E>(result: Result<T, E>, closed: Result<()>) -> Result<T, E> {
    if let Err(e) = closed {
        warn!(error = %e, "Failed to close storage backend");
    }
    result
}
