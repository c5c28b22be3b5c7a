//! projsync CLI - Command-line interface for projsync
//!
//! Provides commands for:
//! - Syncing a local tree (and its submodules) into remote projects
//! - Listing remote files
//! - Inspecting submodules and creating their projects
//! - Viewing and validating configuration

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, ls::LsCommand,
    submodule::SubmoduleCommand, sync::SyncCommand, CommandContext,
};
use output::OutputFormat;
use projsync_core::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "projsync",
    version,
    about = "Sync a local directory tree into remote projects"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize the local tree with its remote projects
    Sync(SyncCommand),
    /// List remote files of the configured project
    Ls(LsCommand),
    /// Inspect submodules and manage their projects
    #[command(subcommand)]
    Submodule(SubmoduleCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Log filter for the given flags; `default_level` applies without `-v`
fn log_filter(verbose: u8, quiet: bool, default_level: &str) -> String {
    match (quiet, verbose) {
        (true, _) => "error".to_string(),
        (false, 0) => default_level.to_string(),
        (false, 1) => "info".to_string(),
        (false, 2) => "debug".to_string(),
        (false, _) => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let default_level = Config::load_or_default(&config_path).logging.level;

    // Setup tracing
    let filter = log_filter(cli.verbose, cli.quiet, &default_level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CommandContext {
        config_path,
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        quiet: cli.quiet,
    };

    let result = match &cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Ls(cmd) => cmd.execute(&ctx).await,
        Commands::Submodule(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            ctx.formatter().error(&format!("{err:#}"));
            ExitCode::from(1)
        }
    }
}
