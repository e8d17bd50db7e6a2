//! bucketsync CLI - Command-line interface for bucketsync
//!
//! Provides commands for:
//! - Synchronizing a local directory with a remote bucket
//! - Checking connection and pending changes
//! - Creating configuration files
//! - Managing stored API tokens
//! - Listing objects and printing public URLs
//! - Purging a Bunny.net pull zone cache

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    completions::CompletionsCommand, init::InitCommand, ls::LsCommand, purge::PurgeCommand,
    status::StatusCommand, sync::SyncCommand, token::TokenCommand, url::UrlCommand, CliContext,
};
use output::{get_formatter, OutputFormat};

/// Exit code reported when the user interrupts a command
const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Parser)]
#[command(
    name = "bucketsync",
    version,
    about = "Synchronize local directories with cloud storage buckets"
)]
pub struct Cli {
    /// Local directory to operate on
    #[arg(short, long, global = true, default_value = ".")]
    directory: PathBuf,

    /// Configuration file (default: <directory>/.bucketsync)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Named bucket entry in a multi-bucket configuration file
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize the local directory with the bucket
    Sync(SyncCommand),
    /// Show connection status and pending changes
    Status(StatusCommand),
    /// Create a configuration file
    Init(InitCommand),
    /// Manage stored API tokens
    #[command(subcommand)]
    Token(TokenCommand),
    /// List remote objects
    Ls(LsCommand),
    /// Print the public URL of a remote object
    Url(UrlCommand),
    /// Purge the CDN cache of a Bunny.net pull zone
    Purge(PurgeCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    fn context(&self) -> CliContext {
        CliContext {
            directory: self.directory.clone(),
            config: self.config.clone(),
            bucket: self.bucket.clone(),
            quiet: self.quiet,
            format: self.format(),
        }
    }
}

impl Commands {
    async fn execute(&self, ctx: &CliContext) -> anyhow::Result<()> {
        match self {
            Commands::Sync(cmd) => cmd.execute(ctx).await,
            Commands::Status(cmd) => cmd.execute(ctx).await,
            Commands::Init(cmd) => cmd.execute(ctx).await,
            Commands::Token(cmd) => cmd.execute(ctx).await,
            Commands::Ls(cmd) => cmd.execute(ctx).await,
            Commands::Url(cmd) => cmd.execute(ctx).await,
            Commands::Purge(cmd) => cmd.execute(ctx).await,
            Commands::Completions(cmd) => cmd.execute(ctx).await,
        }
    }
}

/// Default log level when `RUST_LOG` is unset.
fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = log_level(verbose, quiet);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let ctx = cli.context();
    let formatter = get_formatter(ctx.format, false);

    tokio::select! {
        result = cli.command.execute(&ctx) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                formatter.error(&format!("{e:#}"));
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            formatter.error("Operation cancelled by user");
            ExitCode::from(EXIT_CANCELLED)
        }
    }
}
