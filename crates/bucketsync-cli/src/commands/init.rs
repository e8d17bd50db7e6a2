//! Init command - Create a configuration file
//!
//! Secrets passed on the command line are stored in the system keyring
//! under the bucket's token context; the written file never contains them.

use std::path::Path;

use anyhow::{Context, Result};
use bucketsync_core::config::{BucketConfig, BucketConfigBuilder};
use bucketsync_providers::TokenManager;
use clap::Args;
use serde_json::json;
use tracing::info;

use super::CliContext;

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Storage provider
    #[arg(long, value_parser = ["bunny", "b2", "s3", "linode"])]
    pub provider: String,

    /// Bucket or storage zone name
    #[arg(long)]
    pub bucket_name: String,

    /// API key, application key or secret access key (stored in the keyring)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Key id paired with the API key, for B2 and S3 (stored in the keyring)
    #[arg(long)]
    pub token_id: Option<String>,

    /// Name the stored token is looked up under (default: provider name)
    #[arg(long)]
    pub token_context: Option<String>,

    /// Provider region
    #[arg(long)]
    pub region: Option<String>,

    /// Paths to sync by default (relative to the directory)
    #[arg(long, num_args = 1..)]
    pub paths: Vec<String>,

    /// Delete remote files that do not exist locally
    #[arg(long)]
    pub delete_orphaned: bool,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    /// Configuration described by the flags.
    pub fn build_config(&self) -> Result<BucketConfig> {
        let mut builder = BucketConfigBuilder::new(&self.provider, &self.bucket_name)
            .sync_paths(self.paths.iter().cloned())
            .delete_orphaned(self.delete_orphaned);
        if let Some(context) = &self.token_context {
            builder = builder.token_context(context);
        }
        if let Some(region) = &self.region {
            builder = builder.region(region);
        }

        builder.build_validated().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::anyhow!("Invalid configuration: {}", messages.join("; "))
        })
    }

    /// Write the configuration to `path`, refusing to overwrite unless forced.
    pub fn write_config(&self, path: &Path) -> Result<BucketConfig> {
        if path.exists() && !self.force {
            anyhow::bail!(
                "Configuration file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
        let config = self.build_config()?;
        config
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote configuration");
        Ok(config)
    }

    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let path = ctx.config_path();
        let config = self.write_config(&path)?;
        let context = config.effective_token_context().to_string();

        let tokens = TokenManager::default();
        if let Some(key) = &self.api_key {
            tokens
                .save_token(&context, key)
                .context("Failed to store API key in the keyring")?;
        }
        if let Some(id) = &self.token_id {
            tokens
                .save_token_id(&context, id)
                .context("Failed to store token id in the keyring")?;
        }

        if ctx.is_json() {
            formatter.print_json(&json!({
                "config": path.display().to_string(),
                "provider": config.provider,
                "bucket": config.bucket_name,
                "token_context": context,
                "token_stored": self.api_key.is_some(),
            }));
        } else {
            formatter.success(&format!("Created configuration {}", path.display()));
            if self.api_key.is_some() {
                formatter.info(&format!("API key stored in keyring (context '{context}')"));
            } else {
                formatter.info(&format!(
                    "Store a token with: bucketsync token set {context}"
                ));
            }
        }
        Ok(())
    }
}
