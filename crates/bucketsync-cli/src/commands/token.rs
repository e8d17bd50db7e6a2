//! Token commands - Manage API tokens stored in the system keyring

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use bucketsync_providers::TokenManager;
use clap::Subcommand;
use serde_json::json;

use super::CliContext;

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Store a token (read from stdin when no value is given)
    Set {
        /// Token context (bucket or provider name)
        context: String,
        /// Token value
        value: Option<String>,
        /// Store the key id instead of the key
        #[arg(long)]
        id: bool,
    },
    /// Show a stored token
    Get {
        /// Token context (bucket or provider name)
        context: String,
        /// Show the key id instead of the key
        #[arg(long)]
        id: bool,
        /// Print the full value instead of a masked one
        #[arg(long)]
        reveal: bool,
    },
    /// Delete the token and key id stored for a context
    Delete {
        /// Token context (bucket or provider name)
        context: String,
    },
}

/// Keep the first four characters of a secret visible.
pub fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

fn read_secret_from_stdin() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read token from stdin")?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("No token given");
    }
    Ok(value)
}

impl TokenCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let tokens = TokenManager::default();

        match self {
            TokenCommand::Set { context, value, id } => {
                let value = match value {
                    Some(v) => v.clone(),
                    None => read_secret_from_stdin()?,
                };
                if *id {
                    tokens.save_token_id(context, &value)?;
                } else {
                    tokens.save_token(context, &value)?;
                }
                formatter.success(&format!("Token stored for '{context}'"));
            }
            TokenCommand::Get {
                context,
                id,
                reveal,
            } => {
                let stored = if *id {
                    tokens.get_token_id(context)?
                } else {
                    tokens.get_token(context)?
                };
                let Some(secret) = stored else {
                    anyhow::bail!("No token stored for '{context}'");
                };
                let shown = if *reveal { secret } else { mask(&secret) };
                if ctx.is_json() {
                    formatter.print_json(&json!({ "context": context, "token": shown }));
                } else {
                    println!("{shown}");
                }
            }
            TokenCommand::Delete { context } => {
                tokens.delete(context)?;
                formatter.success(&format!("Token deleted for '{context}'"));
            }
        }
        Ok(())
    }
}
