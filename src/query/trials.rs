//! Trials of an experiment, runs of a trial, and the accuracy curve.

use super::{cmp_nulls_last, mean, SortOrder};
use crate::store::{Run, Snapshot, TrialRecord, TrialStatus};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Trials of one experiment, oldest first, optionally restricted to one status.
pub fn list_trials(
    snapshot: &Snapshot,
    experiment_id: i64,
    status: Option<TrialStatus>,
) -> Vec<&TrialRecord> {
    let mut rows: Vec<&TrialRecord> = snapshot
        .trials_for(experiment_id)
        .filter(|t| status.is_none() || t.trial.status == status)
        .collect();
    rows.sort_by(|a, b| cmp_nulls_last(&a.trial.created_at, &b.trial.created_at, SortOrder::Asc));
    rows
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialDetail<'a> {
    #[serde(flatten)]
    pub record: &'a TrialRecord,
    /// `None` when the trial points at an experiment that does not exist.
    pub experiment_name: Option<&'a str>,
}

pub fn get_trial(snapshot: &Snapshot, id: i64) -> Option<TrialDetail<'_>> {
    let record = snapshot.trial(id)?;
    let experiment_name = snapshot
        .experiment(record.trial.experiment_id)
        .map(|e| e.experiment.name.as_str());
    Some(TrialDetail {
        record,
        experiment_name,
    })
}

/// A run with its derived per-token cost.
#[derive(Debug, Clone, Serialize)]
pub struct RunView<'a> {
    #[serde(flatten)]
    pub run: &'a Run,
    pub cost_per_token: f64,
}

/// Runs of one trial, oldest first.
pub fn list_runs(snapshot: &Snapshot, trial_id: i64) -> Vec<RunView<'_>> {
    let mut runs: Vec<&Run> = snapshot.runs_for(trial_id).collect();
    runs.sort_by(|a, b| cmp_nulls_last(&a.created_at, &b.created_at, SortOrder::Asc));
    runs.into_iter()
        .map(|run| RunView {
            run,
            cost_per_token: run.cost_per_token(),
        })
        .collect()
}

/// Run measurements of one trial. All zero when the trial has no runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrialStats {
    pub total_runs: usize,
    pub total_cost: f64,
    pub avg_latency: f64,
    pub total_tokens: u64,
    pub min_latency: Option<u64>,
    pub max_latency: Option<u64>,
}

pub fn trial_stats(snapshot: &Snapshot, trial_id: i64) -> TrialStats {
    let runs: Vec<&Run> = snapshot.runs_for(trial_id).collect();
    let latencies: Vec<u64> = runs.iter().filter_map(|r| r.latency_ms).collect();
    TrialStats {
        total_runs: runs.len(),
        total_cost: runs.iter().filter_map(|r| r.costs).sum(),
        avg_latency: mean(latencies.iter().map(|&l| l as f64)).unwrap_or(0.0),
        total_tokens: runs.iter().filter_map(|r| r.tokens).fold(0, u64::saturating_add),
        min_latency: latencies.iter().copied().min(),
        max_latency: latencies.iter().copied().max(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyPoint {
    pub trial_id: i64,
    pub timestamp: NaiveDateTime,
    pub accuracy: f64,
    pub status: TrialStatus,
}

/// Finished trials with an accuracy and a timestamp, in time order.
pub fn accuracy_curve(snapshot: &Snapshot, experiment_id: i64) -> Vec<AccuracyPoint> {
    let mut points: Vec<AccuracyPoint> = snapshot
        .trials_for(experiment_id)
        .filter_map(|t| {
            Some(AccuracyPoint {
                trial_id: t.trial.id,
                timestamp: t.trial.created_at?,
                accuracy: t.trial.finished_accuracy()?,
                status: TrialStatus::Finished,
            })
        })
        .collect();
    points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    points
}
