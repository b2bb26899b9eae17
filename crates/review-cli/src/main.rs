//! `review` - stream a compliance review from the terminal
//!
//! ## Commands
//!
//! - `stream`: submit a review id, print blocks as they stream in, then
//!   summarise verdicts in a paginated table
//! - `extract`: split a saved block into review fields

mod commands;
mod render;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use review_core::ReviewConfig;
use tracing::Level;

use commands::extract::ExtractArgs;
use commands::stream::StreamArgs;

#[derive(Parser)]
#[command(name = "review")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stream and summarise compliance reviews", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/review-stream/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a review and render its blocks
    Stream(StreamArgs),

    /// Extract review fields from a block saved as text
    Extract(ExtractArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_level, cli.log_json);

    match cli.command {
        Commands::Stream(args) => {
            let config = ReviewConfig::load(cli.config.as_deref())
                .context("Failed to load configuration")?;
            commands::stream::run(args, config).await
        }
        Commands::Extract(args) => commands::extract::run(&args),
    }
}
