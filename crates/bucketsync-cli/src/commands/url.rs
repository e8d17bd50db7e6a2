//! Url command - Print the public URL of a remote object

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{after_close, CliContext};

#[derive(Debug, Args)]
pub struct UrlCommand {
    /// Remote path of the object
    pub remote_path: String,
}

impl UrlCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let client = ctx.connect().await?;
        let url = client.get_public_url(&self.remote_path).await;
        let url = after_close(url, client.close().await)?;

        if ctx.is_json() {
            formatter.print_json(&json!({ "path": self.remote_path, "url": url }));
        } else {
            println!("{url}");
        }
        Ok(())
    }
}
