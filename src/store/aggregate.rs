//! Rollups: runs folded into trials, trials folded into experiments.
//!
//! Each fold groups child rows by an explicit foreign key into a `BTreeMap`
//! and then joins the groups back onto the parent rows by primary key, so the
//! output order always follows the parent table and recomputing from the same
//! base tables produces identical values.

use super::types::{
    Experiment, ExperimentRecord, ExperimentRollup, Run, Trial, TrialRecord, TrialRollup,
};
use std::collections::BTreeMap;

#[derive(Default)]
struct RunAcc {
    cost: f64,
    tokens: u64,
    latency_sum: f64,
    latency_count: u64,
    runs: u64,
}

/// Group runs by `trial_id` and compute per-trial totals.
pub fn rollup_runs(runs: &[Run]) -> BTreeMap<i64, TrialRollup> {
    let mut groups: BTreeMap<i64, RunAcc> = BTreeMap::new();
    for run in runs {
        let acc = groups.entry(run.trial_id).or_default();
        acc.runs += 1;
        acc.cost += run.costs.unwrap_or(0.0);
        acc.tokens = acc.tokens.saturating_add(run.tokens.unwrap_or(0));
        if let Some(latency) = run.latency_ms {
            acc.latency_sum += latency as f64;
            acc.latency_count += 1;
        }
    }
    groups
        .into_iter()
        .map(|(trial_id, acc)| {
            let avg_latency_ms = if acc.latency_count > 0 {
                acc.latency_sum / acc.latency_count as f64
            } else {
                0.0
            };
            (
                trial_id,
                TrialRollup {
                    total_cost: acc.cost,
                    total_tokens: acc.tokens,
                    avg_latency_ms,
                    run_count: acc.runs,
                },
            )
        })
        .collect()
}

/// Merge run rollups onto trials by `trial.id == run.trial_id`.
/// Trials without runs get a zero rollup.
pub fn augment_trials(trials: &[Trial], runs: &[Run]) -> Vec<TrialRecord> {
    let rollups = rollup_runs(runs);
    trials
        .iter()
        .map(|trial| TrialRecord {
            trial: trial.clone(),
            rollup: rollups.get(&trial.id).copied().unwrap_or_default(),
        })
        .collect()
}

#[derive(Default)]
struct TrialAcc {
    trials: u64,
    runs: u64,
    cost: f64,
    accuracy_sum: f64,
    accuracy_count: u64,
}

/// Group augmented trials by `experiment_id` and compute per-experiment totals.
pub fn rollup_trials(trials: &[TrialRecord]) -> BTreeMap<i64, ExperimentRollup> {
    let mut groups: BTreeMap<i64, TrialAcc> = BTreeMap::new();
    for record in trials {
        let acc = groups.entry(record.trial.experiment_id).or_default();
        acc.trials += 1;
        acc.runs += record.rollup.run_count;
        acc.cost += record.rollup.total_cost;
        if let Some(accuracy) = record.trial.finished_accuracy() {
            acc.accuracy_sum += accuracy;
            acc.accuracy_count += 1;
        }
    }
    groups
        .into_iter()
        .map(|(experiment_id, acc)| {
            let avg_accuracy = if acc.accuracy_count > 0 {
                Some(acc.accuracy_sum / acc.accuracy_count as f64)
            } else {
                None
            };
            (
                experiment_id,
                ExperimentRollup {
                    total_trials: acc.trials,
                    total_runs: acc.runs,
                    total_cost: acc.cost,
                    avg_accuracy,
                },
            )
        })
        .collect()
}

/// Merge trial rollups onto experiments by `experiment.id == trial.experiment_id`.
pub fn augment_experiments(experiments: &[Experiment], trials: &[TrialRecord]) -> Vec<ExperimentRecord> {
    let rollups = rollup_trials(trials);
    experiments
        .iter()
        .map(|experiment| ExperimentRecord {
            experiment: experiment.clone(),
            rollup: rollups.get(&experiment.id).copied().unwrap_or_default(),
        })
        .collect()
}
