//! takt-action - GitHub Action entry point for takt
//!
//! Reacts to `pull_request` and `issue_comment` events: builds task context,
//! runs `takt` workflows on `@takt run` mentions and posts the results back.

mod actions;
mod commands;
mod handler;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use takt_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{HandleArgs, ParseArgs};

/// Run takt workflows from GitHub events
#[derive(Parser, Debug)]
#[command(name = "takt-action")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/takt-action/config.toml)
    #[arg(long, global = true, env = "TAKT_ACTION_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle the event that triggered the workflow
    Handle(HandleArgs),

    /// Show how a mention comment is parsed
    Parse(ParseArgs),

    /// Show current configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if let Err(err) = run(cli).await {
        actions::error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Handle(args)) => {
            args.execute(cli.config.as_deref()).await?;
        }
        // Actions invokes the binary without arguments
        None => {
            HandleArgs::from_env()?
                .execute(cli.config.as_deref())
                .await?;
        }
        Some(Commands::Parse(args)) => {
            args.execute()?;
        }
        Some(Commands::Config) => {
            let config = match cli.config {
                Some(ref path) => Config::load_from_file(path)?,
                None => Config::load()?,
            }
            .with_env_overrides();

            println!("takt-action Configuration");
            println!("=========================");
            println!();
            println!("takt:");
            println!("  path: {}", config.takt.path);
            println!("  install_source: {:?}", config.takt.install_source);
            println!("  log_output: {}", config.takt.log_output);
            println!();
            println!("Defaults:");
            println!("  workflow: {}", config.defaults.workflow);
            println!("  model: {}", config.defaults.model.as_deref().unwrap_or("(default)"));
            println!("  provider: {}", config.defaults.provider.as_deref().unwrap_or("(default)"));
            println!();
            println!("Review:");
            println!("  post_review: {}", config.review.post_review);
            println!("  workflow: {}", config.review.workflow);
            println!();
            if let Some(path) = cli.config.or_else(Config::default_config_path) {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        Some(Commands::Version) => {
            println!("takt-action {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
