//! # Store — In-Memory Tables Loaded from CSV
//!
//! Loads `experiments.csv`, `trials.csv`, and `runs.csv` from a data directory,
//! normalizes them, merges rollups, and publishes the result as an immutable
//! [`Snapshot`] behind a [`Store`] handle.
//!
//! ## Pipeline
//!
//! ```text
//! CSV files ─▶ RawTable ─▶ canonicalize ─▶ typed rows ─▶ rollups ─▶ Snapshot
//! ```
//!
//! ## Module Structure
//!
//! - [`types`] — Row types, `TrialStatus`, rollup structs
//! - [`normalize`] — CSV reading, header fix-ups, timestamp/number parsing
//! - [`aggregate`] — Run→trial and trial→experiment rollups
//! - [`snapshot`] — `Snapshot` with indices, `Store` with atomic swap
//!
//! Any error in this pipeline aborts the load; nothing half-built is served.

pub mod aggregate;
pub mod normalize;
pub mod snapshot;
pub mod types;

pub use snapshot::{LoadReport, Snapshot, Store};
pub use types::*;

use anyhow::{Context, Result};
use normalize::RawTable;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Locations of the three input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub experiments: PathBuf,
    pub trials: PathBuf,
    pub runs: PathBuf,
}

impl DataPaths {
    /// The conventional file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        DataPaths {
            experiments: dir.join("experiments.csv"),
            trials: dir.join("trials.csv"),
            runs: dir.join("runs.csv"),
        }
    }
}

/// Read and normalize all three files.
pub fn load_tables(paths: &DataPaths) -> Result<(Tables, LoadReport)> {
    let (experiments, exp_report) = normalize::normalize_experiments(RawTable::from_path(&paths.experiments)?)
        .with_context(|| format!("loading {}", paths.experiments.display()))?;
    let (trials, trial_report) = normalize::normalize_trials(RawTable::from_path(&paths.trials)?)
        .with_context(|| format!("loading {}", paths.trials.display()))?;
    let (runs, run_report) = normalize::normalize_runs(RawTable::from_path(&paths.runs)?)
        .with_context(|| format!("loading {}", paths.runs.display()))?;

    let report = LoadReport {
        experiments: exp_report,
        trials: trial_report,
        runs: run_report,
    };
    for r in [&report.experiments, &report.trials, &report.runs] {
        if !r.is_clean() {
            warn!(
                table = r.table,
                skipped_rows = r.skipped_rows,
                malformed_cells = r.total_malformed(),
                "coerced malformed cells to null"
            );
        }
        if r.timestamp_fallback {
            warn!(table = r.table, "created_at fell back to permissive timestamp parsing");
        }
    }

    Ok((
        Tables {
            experiments,
            trials,
            runs,
        },
        report,
    ))
}
