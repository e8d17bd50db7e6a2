//! Status command - Connection report and pending changes

use anyhow::Result;
use bucketsync_core::domain::SyncResult;
use bucketsync_core::ports::ConnectionReport;
use bucketsync_sync::{BucketClient, SyncOptions};
use clap::Args;
use serde_json::json;

use super::{after_close, CliContext};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Limit the pending-change check to these paths
    #[arg(long, num_args = 1..)]
    pub paths: Vec<String>,
}

fn outcome_label(outcome: Option<bool>) -> &'static str {
    match outcome {
        Some(true) => "ok",
        Some(false) => "failed",
        None => "not configured",
    }
}

fn report_json(report: &ConnectionReport) -> serde_json::Value {
    report
        .checks
        .iter()
        .map(|(method, outcome)| (method.clone(), json!(outcome)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

impl StatusCommand {
    async fn check(
        &self,
        client: &BucketClient,
        ctx: &CliContext,
    ) -> Result<(ConnectionReport, Option<SyncResult>)> {
        let report = client.test_connection().await?;
        if !report.is_connected() {
            return Ok((report, None));
        }
        let options = SyncOptions {
            dry_run: true,
            sync_paths: (!self.paths.is_empty()).then(|| self.paths.clone()),
            ..SyncOptions::default()
        };
        let pending = client.sync(&ctx.directory, &options, None).await?;
        Ok((report, Some(pending)))
    }

    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let client = ctx.connect().await?;
        let config = client.config();

        let checked = self.check(&client, ctx).await;
        let (report, pending) = after_close(checked, client.close().await)?;

        if ctx.is_json() {
            formatter.print_json(&json!({
                "provider": config.provider,
                "bucket": config.bucket_name,
                "connected": report.is_connected(),
                "connection": report_json(&report),
                "pending": pending.as_ref().map(|p| json!({
                    "upload": p.uploaded,
                    "download": p.downloaded,
                    "delete": p.deleted,
                    "unchanged": p.unchanged,
                    "protected_skipped": p.protected_skipped,
                })),
            }));
            return Ok(());
        }

        formatter.info(&format!("Provider: {}", config.provider));
        formatter.info(&format!("Bucket:   {}", config.bucket_name));
        for (method, outcome) in &report.checks {
            formatter.info(&format!("{method}: {}", outcome_label(*outcome)));
        }

        match pending {
            Some(p) if p.uploaded + p.downloaded + p.deleted == 0 => {
                formatter.success(&format!("Up to date ({} files unchanged)", p.unchanged));
            }
            Some(p) => {
                formatter.success("Connected");
                formatter.info(&format!(
                    "Pending: {} to upload, {} to download, {} to delete, {} unchanged",
                    p.uploaded, p.downloaded, p.deleted, p.unchanged
                ));
            }
            None => anyhow::bail!("Could not connect to {} bucket '{}'", config.provider, config.bucket_name),
        }
        Ok(())
    }
}
