//! Headline numbers for the dashboard landing page.

use crate::query::mean;
use crate::store::{Snapshot, TrialStatus};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_experiments: usize,
    pub total_trials: usize,
    pub total_runs: usize,
    pub total_cost: f64,
    /// Mean accuracy of finished trials; `None` when no finished trial has one.
    pub avg_accuracy: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    /// Pending plus running.
    pub active_trials: usize,
    pub failed_trials: usize,
    /// Finished trials as a percentage of all trials, 0 when there are none.
    pub success_rate: f64,
}

pub fn dashboard_stats(snapshot: &Snapshot) -> DashboardStats {
    let trials = snapshot.trials();
    let runs = snapshot.runs();

    let count = |pred: &dyn Fn(TrialStatus) -> bool| {
        trials
            .iter()
            .filter(|t| t.trial.status.is_some_and(pred))
            .count()
    };
    let finished = count(&|s| s == TrialStatus::Finished);

    let success_rate = if trials.is_empty() {
        0.0
    } else {
        finished as f64 / trials.len() as f64 * 100.0
    };

    DashboardStats {
        total_experiments: snapshot.experiments().len(),
        total_trials: trials.len(),
        total_runs: runs.len(),
        total_cost: runs.iter().filter_map(|r| r.costs).sum(),
        avg_accuracy: mean(trials.iter().filter_map(|t| t.trial.finished_accuracy())),
        avg_latency_ms: mean(runs.iter().filter_map(|r| r.latency_ms).map(|l| l as f64)),
        active_trials: count(&|s| s.is_active()),
        failed_trials: count(&|s| s == TrialStatus::Failed),
        success_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures;
    use crate::store::Tables;

    #[test]
    fn two_experiment_scenario() {
        let stats = dashboard_stats(&fixtures::scenario());
        assert_eq!(stats.total_experiments, 2);
        assert_eq!(stats.total_trials, 4);
        assert_eq!(stats.total_runs, 4);
        assert!((stats.total_cost - 4.0).abs() < 1e-12);
        assert!((stats.avg_accuracy.unwrap() - 2.2 / 3.0).abs() < 1e-9);
        assert!((stats.avg_latency_ms.unwrap() - 250.0).abs() < 1e-12);
        assert_eq!(stats.active_trials, 0);
        assert_eq!(stats.failed_trials, 1);
        assert!((stats.success_rate - 75.0).abs() < 1e-12);
    }

    #[test]
    fn empty_snapshot_has_zero_rate_and_null_means() {
        let snap = Snapshot::build(1, Tables::default(), Default::default());
        let stats = dashboard_stats(&snap);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.avg_accuracy, None);
        assert_eq!(stats.avg_latency_ms, None);
    }

    #[test]
    fn active_counts_pending_and_running() {
        let mut tables = fixtures::scenario_tables();
        tables.trials.push(fixtures::trial(5, 2, TrialStatus::Pending, None, 7));
        tables.trials.push(fixtures::trial(6, 2, TrialStatus::Running, None, 7));
        let snap = Snapshot::build(1, tables, Default::default());
        let stats = dashboard_stats(&snap);
        assert_eq!(stats.active_trials, 2);
        assert!((stats.success_rate - 50.0).abs() < 1e-12);
    }
}
