//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;

pub const EXPERIMENTS_CSV: &str = "\
id,experiment_name,project_id,created_at,is_del
1,exp-1,project_a,2024-03-01 00:00:00,False
2,exp-2,project_b,2024-03-03 00:00:00,False
";

pub const TRIALS_CSV: &str = "\
id,experiment_id,status,created_at,accuracy,duration(s)
1,1,finished,04/03/2024 00:00,0.8,60.0
2,1,finished,02/03/2024 00:00,0.9,120.0
3,1,failed,03/03/2024 00:00,,180.0
4,2,finished,05/03/2024 00:00,0.5,240.0
";

pub const RUNS_CSV: &str = "\
id,trial_id,tokens,costs,latency(ms),created_at
1,1,1000,1.0,100,04/03/2024 12:00
2,1,0,0.5,200,04/03/2024 12:00
3,2,2000,2.0,300,05/03/2024 12:00
4,4,500,0.5,400,06/03/2024 12:00
";

/// Write the reference dataset into a fresh temporary directory.
///
/// Experiment 1 (`exp-1`) has two finished trials (accuracy 0.8 and 0.9)
/// and one failed trial; experiment 2 (`exp-2`) has one finished trial
/// (0.5). Four runs cost 4.0 in total, 3.5 of it under experiment 1.
pub fn write_scenario() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), EXPERIMENTS_CSV, TRIALS_CSV, RUNS_CSV);
    dir
}

pub fn write_files(dir: &Path, experiments: &str, trials: &str, runs: &str) {
    std::fs::write(dir.join("experiments.csv"), experiments).unwrap();
    std::fs::write(dir.join("trials.csv"), trials).unwrap();
    std::fs::write(dir.join("runs.csv"), runs).unwrap();
}

/// Build an Axum test app over the reference dataset.
///
/// The returned `TempDir` must outlive the router so that reloads can read
/// the files again.
pub fn build_test_app() -> (axum::Router, TempDir) {
    let dir = write_scenario();
    let config = llmobs::config::Config::with_data_dir(dir.path());
    let store = llmobs::store::Store::open(config.data.clone()).unwrap();
    let state = llmobs::dashboard::AppState::new(store, config);
    (llmobs::dashboard::build_router(state), dir)
}

/// Same as [`build_test_app`] but with the memo cache switched off.
pub fn build_uncached_app() -> (axum::Router, TempDir) {
    let dir = write_scenario();
    let mut config = llmobs::config::Config::with_data_dir(dir.path());
    config.enable_cache = false;
    let store = llmobs::store::Store::open(config.data.clone()).unwrap();
    let state = llmobs::dashboard::AppState::new(store, config);
    (llmobs::dashboard::build_router(state), dir)
}
