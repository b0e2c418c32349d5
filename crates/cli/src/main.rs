//! ctxpack CLI: the main entry point.
//!
//! Commands:
//! - `compact`: compact a session file to the configured token budget
//! - `estimate`: show per-entry token estimates and priorities
//! - `init-config`: print (or write) the default configuration

use clap::{Parser, Subcommand};
use ctxpack_core::Strategy;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ctxpack",
    about = "ctxpack: context compaction for agent sessions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compact a session file
    Compact {
        /// Session file (JSON array or JSON lines of entries)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the compacted session here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Branch the entries belong to
        #[arg(short, long, default_value = ctxpack_core::DEFAULT_BRANCH)]
        branch: String,

        /// Override the configured strategy (aggressive, balanced, conservative)
        #[arg(short, long)]
        strategy: Option<Strategy>,

        /// Override the configured token budget
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Override the configured reserve
        #[arg(long)]
        reserve_tokens: Option<usize>,

        /// Config file (defaults to ~/.ctxpack/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Estimate token usage of a session file
    Estimate {
        /// Session file (JSON array or JSON lines of entries)
        #[arg(short, long)]
        input: PathBuf,

        /// Config file (defaults to ~/.ctxpack/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration
    InitConfig {
        /// Write it to ~/.ctxpack/config.toml if no config exists yet
        #[arg(short, long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing (stderr, so compacted JSON on stdout stays clean)
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compact {
            input,
            output,
            branch,
            strategy,
            max_tokens,
            reserve_tokens,
            config,
        } => {
            let options = commands::compact::CompactOptions {
                input,
                output,
                branch,
                strategy,
                max_tokens,
                reserve_tokens,
                config,
            };
            commands::compact::run(options).await?
        }
        Commands::Estimate { input, config } => {
            commands::estimate::run(&input, config.as_deref()).await?
        }
        Commands::InitConfig { write } => commands::init_config::run(write).await?,
    }

    Ok(())
}
