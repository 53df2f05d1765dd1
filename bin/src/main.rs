//! octoharvest CLI - GitHub activity harvester with a shared rate budget.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "octoharvest")]
#[command(about = "Harvest GitHub activity data into SQLite", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path. Defaults to octoharvest.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest forks, stars, issues, and pulls for the configured repositories
    Harvest {
        /// Only harvest this repository (owner/name)
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// List the configured repositories
    Repos,

    /// Show per-repository watermarks and stored row counts
    Watermarks,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("octoharvest={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Harvest { repo } => {
            commands::harvest::run(&config, repo.as_deref(), cli.quiet).await
        }
        Commands::Repos => commands::repos::run(&config),
        Commands::Watermarks => commands::watermarks::run(&config).await,
    }
}
