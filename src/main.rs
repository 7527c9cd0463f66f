//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the API server, the sample-data generator, and a
//! one-shot summary printer. Handles shared concerns: `.env` loading, logging
//! setup, and resolving the data-file locations.
//!
//! ## Subcommands
//!
//! - `serve`: load the CSVs and run the HTTP API until SIGINT/SIGTERM.
//! - `generate`: write a reproducible sample dataset.
//! - `summary`: load the CSVs and print dashboard stats as JSON.
//!
//! ## Global Options
//!
//! - `--data-dir` / `LLMOBS_DATA_DIR`: directory holding the three CSVs.
//! - `--experiments-file`, `--trials-file`, `--runs-file` (and matching
//!   `LLMOBS_*_FILE` variables): file names inside the data directory.

mod cli;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "llmobs",
    version,
    about = "Read-only analytics API over LLM experiment, trial, and run data"
)]
struct Cli {
    /// Directory containing the experiment, trial, and run CSVs
    #[arg(long, env = "LLMOBS_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Experiments file name, relative to the data directory
    #[arg(long, env = "LLMOBS_EXPERIMENTS_FILE", default_value = "experiments.csv", global = true)]
    experiments_file: PathBuf,

    /// Trials file name, relative to the data directory
    #[arg(long, env = "LLMOBS_TRIALS_FILE", default_value = "trials.csv", global = true)]
    trials_file: PathBuf,

    /// Runs file name, relative to the data directory
    #[arg(long, env = "LLMOBS_RUNS_FILE", default_value = "runs.csv", global = true)]
    runs_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "LLMOBS_HOST", default_value = llmobs::config::DEFAULT_HOST)]
    host: String,
    /// Port to listen on
    #[arg(long, env = "LLMOBS_PORT", default_value_t = llmobs::config::DEFAULT_PORT)]
    port: u16,
    /// Path prefix for API routes
    #[arg(long, env = "LLMOBS_API_PREFIX", default_value = llmobs::config::DEFAULT_API_PREFIX)]
    api_prefix: String,
    /// Comma-separated allowed CORS origins ("*" for any)
    #[arg(long, env = "LLMOBS_CORS_ORIGINS", default_value = llmobs::config::DEFAULT_CORS_ORIGINS)]
    cors_origins: String,
    /// Memoize dashboard stats and cost breakdown per snapshot
    #[arg(long, env = "LLMOBS_ENABLE_CACHE", default_value_t = true, action = clap::ArgAction::Set)]
    enable_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve(ServeArgs),
    /// Write a reproducible sample dataset
    Generate {
        /// Output directory (created if missing)
        #[arg(long, default_value = "data")]
        out: PathBuf,
        /// Number of experiments
        #[arg(long, default_value_t = 4)]
        experiments: usize,
        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Reference "now" for generated timestamps (defaults to the current time)
        #[arg(long)]
        anchor: Option<String>,
    },
    /// Load the data directory and print dashboard stats as JSON
    Summary,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve(args) => cli::run_serve(&cli, args),
        Commands::Generate {
            out,
            experiments,
            seed,
            anchor,
        } => cli::run_generate(out, *experiments, *seed, anchor.as_deref()),
        Commands::Summary => cli::run_summary(&cli),
    }
}
