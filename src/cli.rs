//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim: config resolution,
//! runtime setup for `serve`, and the two offline subcommands.

use anyhow::{Context, Result};
use llmobs::config::{self, Config};
use llmobs::generate::{self, GenerateOptions};
use llmobs::store::normalize::parse_permissive;
use llmobs::store::{self, DataPaths, Snapshot};
use std::path::Path;
use tracing::info;

use super::{Cli, ServeArgs};

fn data_paths(cli: &Cli) -> DataPaths {
    config::data_paths(
        &cli.data_dir,
        &cli.experiments_file,
        &cli.trials_file,
        &cli.runs_file,
    )
}

pub fn run_serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let config = Config {
        data: data_paths(cli),
        host: args.host.clone(),
        port: args.port,
        api_prefix: config::normalize_prefix(&args.api_prefix),
        cors_origins: config::parse_origins(&args.cors_origins),
        enable_cache: args.enable_cache,
    };
    info!(
        data_dir = %cli.data_dir.display(),
        addr = %config.bind_addr(),
        api_prefix = %config.api_prefix,
        enable_cache = config.enable_cache,
        "llmobs starting"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(llmobs::dashboard::run(config))
}

pub fn run_generate(out: &Path, experiments: usize, seed: u64, anchor: Option<&str>) -> Result<()> {
    let anchor = match anchor {
        Some(s) => parse_permissive(s).with_context(|| format!("unrecognized --anchor {s:?}"))?,
        None => chrono::Utc::now().naive_utc(),
    };
    let opts = GenerateOptions::new(experiments, seed, anchor);
    let tables = generate::generate_tables(&opts);
    generate::write_tables(&tables, out)?;
    info!(
        out = %out.display(),
        experiments = tables.experiments.len(),
        trials = tables.trials.len(),
        runs = tables.runs.len(),
        seed,
        "sample data written"
    );
    Ok(())
}

pub fn run_summary(cli: &Cli) -> Result<()> {
    let (tables, report) = store::load_tables(&data_paths(cli))?;
    let snapshot = Snapshot::build(1, tables, report);
    let stats = llmobs::analytics::dashboard_stats(&snapshot);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
