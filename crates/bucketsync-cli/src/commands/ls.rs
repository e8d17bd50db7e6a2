//! Ls command - List remote objects

use anyhow::Result;
use clap::Args;

use super::{after_close, CliContext};

#[derive(Debug, Args)]
pub struct LsCommand {
    /// Only list objects under this prefix
    pub prefix: Option<String>,
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

impl LsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let client = ctx.connect().await?;
        let files = client.list_files(self.prefix.as_deref()).await;
        let files = after_close(files, client.close().await)?;

        if ctx.is_json() {
            let records: Vec<_> = files.values().collect();
            formatter.print_json(&serde_json::to_value(records)?);
            return Ok(());
        }

        for record in files.values() {
            let modified = record
                .last_modified
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".repeat(16));
            println!("{modified}  {:>10}  {}", format_size(record.size), record.path);
        }
        formatter.success(&format!("{} objects", files.len()));
        Ok(())
    }
}
