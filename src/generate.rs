//! Seeded sample-data generator.
//!
//! Writes the three CSVs in the same shape the upstream exporter produces:
//! `experiment_name`/`is_del`/`duration(s)`/`latency(ms)` headers, ISO
//! timestamps for experiments, day-first minute timestamps for trials and
//! runs, and integer durations written as floats because the column has gaps.
//! A given seed and anchor always produce byte-identical files.

use crate::store::normalize::{DAY_FIRST_TIMESTAMP_FORMAT, EXPERIMENT_TIMESTAMP_FORMAT};
use crate::store::{DataPaths, Experiment, Run, Tables, Trial, TrialStatus};
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::Path;

const PROJECTS: [&str; 3] = ["project_a", "project_b", "project_c"];
/// Finished three times as often as failed or pending.
const STATUS_WEIGHTS: [TrialStatus; 5] = [
    TrialStatus::Finished,
    TrialStatus::Finished,
    TrialStatus::Finished,
    TrialStatus::Failed,
    TrialStatus::Pending,
];

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub experiments: usize,
    pub max_trials_per_experiment: usize,
    pub max_runs_per_trial: usize,
    pub seed: u64,
    /// "Now" for the generated history; every timestamp lies before it.
    pub anchor: NaiveDateTime,
}

impl GenerateOptions {
    pub fn new(experiments: usize, seed: u64, anchor: NaiveDateTime) -> Self {
        GenerateOptions {
            experiments,
            max_trials_per_experiment: 3,
            max_runs_per_trial: 5,
            seed,
            anchor,
        }
    }
}

/// Build the three tables in memory.
pub fn generate_tables(opts: &GenerateOptions) -> Tables {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    // Trial and run timestamps only carry minutes.
    let anchor = opts
        .anchor
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(opts.anchor);

    let experiments: Vec<Experiment> = (1..=opts.experiments as i64)
        .map(|id| Experiment {
            id,
            name: format!("exp-{id}"),
            project_id: PROJECTS.choose(&mut rng).copied().unwrap_or(PROJECTS[0]).to_string(),
            created_at: Some(anchor - Duration::days(rng.gen_range(1..=30))),
            is_deleted: false,
        })
        .collect();

    let mut trials = Vec::new();
    for exp in &experiments {
        let n = rng.gen_range(2..=opts.max_trials_per_experiment + 2);
        for _ in 0..n {
            let status = *STATUS_WEIGHTS.choose(&mut rng).unwrap_or(&TrialStatus::Finished);
            let accuracy = (status == TrialStatus::Finished).then(|| rng.gen_range(0.3..0.95));
            let duration_seconds = matches!(status, TrialStatus::Finished | TrialStatus::Failed)
                .then(|| rng.gen_range(1000..=100_000));
            trials.push(Trial {
                id: trials.len() as i64 + 1,
                experiment_id: exp.id,
                status: Some(status),
                created_at: Some(anchor - Duration::hours(rng.gen_range(1..=500))),
                accuracy,
                duration_seconds,
            });
        }
    }

    let mut runs = Vec::new();
    for trial in &trials {
        let n = rng.gen_range(1..=opts.max_runs_per_trial + 3);
        for _ in 0..n {
            let tokens: u64 = rng.gen_range(100..=500_000);
            // Cost tracks tokens with +/-20% noise, rounded to cents.
            let cost = tokens as f64 * 0.00001 * rng.gen_range(0.8..1.2);
            runs.push(Run {
                id: runs.len() as i64 + 1,
                trial_id: trial.id,
                tokens: Some(tokens),
                costs: Some((cost * 100.0).round() / 100.0),
                latency_ms: Some(rng.gen_range(10..=3000)),
                created_at: Some(anchor - Duration::hours(rng.gen_range(1..=400))),
            });
        }
    }

    Tables {
        experiments,
        trials,
        runs,
    }
}

fn fmt_ts(ts: Option<NaiveDateTime>, format: &str) -> String {
    ts.map(|t| t.format(format).to_string()).unwrap_or_default()
}

fn fmt_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write `tables` into `dir` as `experiments.csv`, `trials.csv`, `runs.csv`.
pub fn write_tables(tables: &Tables, dir: &Path) -> Result<DataPaths> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let paths = DataPaths::in_dir(dir);

    let mut w = csv::Writer::from_path(&paths.experiments)
        .with_context(|| format!("writing {}", paths.experiments.display()))?;
    w.write_record(["id", "experiment_name", "project_id", "created_at", "is_del"])?;
    for e in &tables.experiments {
        w.write_record([
            e.id.to_string(),
            e.name.clone(),
            e.project_id.clone(),
            fmt_ts(e.created_at, EXPERIMENT_TIMESTAMP_FORMAT),
            if e.is_deleted { "True" } else { "False" }.to_string(),
        ])?;
    }
    w.flush()?;

    let mut w = csv::Writer::from_path(&paths.trials)
        .with_context(|| format!("writing {}", paths.trials.display()))?;
    w.write_record(["id", "experiment_id", "status", "created_at", "accuracy", "duration(s)"])?;
    for t in &tables.trials {
        w.write_record([
            t.id.to_string(),
            t.experiment_id.to_string(),
            fmt_opt(t.status.map(|s| s.as_str())),
            fmt_ts(t.created_at, DAY_FIRST_TIMESTAMP_FORMAT),
            fmt_opt(t.accuracy),
            fmt_opt(t.duration_seconds.map(|d| format!("{d}.0"))),
        ])?;
    }
    w.flush()?;

    let mut w = csv::Writer::from_path(&paths.runs)
        .with_context(|| format!("writing {}", paths.runs.display()))?;
    w.write_record(["id", "trial_id", "tokens", "costs", "latency(ms)", "created_at"])?;
    for r in &tables.runs {
        w.write_record([
            r.id.to_string(),
            r.trial_id.to_string(),
            fmt_opt(r.tokens),
            fmt_opt(r.costs),
            fmt_opt(r.latency_ms),
            fmt_ts(r.created_at, DAY_FIRST_TIMESTAMP_FORMAT),
        ])?;
    }
    w.flush()?;

    Ok(paths)
}
