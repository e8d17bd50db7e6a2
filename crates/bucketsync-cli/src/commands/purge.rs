//! Purge command - Purge cached objects from a Bunny.net pull zone

use anyhow::Result;
use bucketsync_providers::BunnyBackend;
use clap::Args;

use super::CliContext;

#[derive(Debug, Args)]
pub struct PurgeCommand {
    /// URLs or paths to purge (default: the whole pull zone)
    pub paths: Vec<String>,
}

impl PurgeCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        if config.provider != "bunny" {
            anyhow::bail!(
                "Cache purging is only supported for bunny, not '{}'",
                config.provider
            );
        }

        let backend = BunnyBackend::from_config(&config)?;
        let paths = (!self.paths.is_empty()).then_some(self.paths.as_slice());
        let report = backend.purge_cache(paths).await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
        } else {
            for error in &report.errors {
                formatter.warn(error);
            }
            if report.success {
                formatter.success(&format!("Purged {} item(s)", report.purged));
            }
        }

        if !report.success {
            anyhow::bail!("Cache purge failed ({} failed)", report.failed);
        }
        Ok(())
    }
}
