//! Cost breakdown by experiment and the daily cost series.

use crate::store::Snapshot;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostByExperiment {
    pub experiment_id: i64,
    pub experiment_name: String,
    pub total_cost: f64,
    /// Share of the grand total, 0..=100. Zero everywhere when nothing cost anything.
    pub percentage: f64,
    pub run_count: u64,
}

/// Experiments with at least one trial, most expensive first.
pub fn cost_by_experiment(snapshot: &Snapshot) -> Vec<CostByExperiment> {
    let mut rows: Vec<CostByExperiment> = snapshot
        .experiments()
        .iter()
        .filter(|r| r.rollup.total_trials > 0)
        .map(|r| CostByExperiment {
            experiment_id: r.experiment.id,
            experiment_name: r.experiment.name.clone(),
            total_cost: r.rollup.total_cost,
            percentage: 0.0,
            run_count: r.rollup.total_runs,
        })
        .collect();

    let grand_total: f64 = rows.iter().map(|r| r.total_cost).sum();
    if grand_total > 0.0 {
        for row in &mut rows {
            row.percentage = row.total_cost / grand_total * 100.0;
        }
    }
    rows.sort_by(|a, b| b.total_cost.total_cmp(&a.total_cost));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCost {
    pub date: NaiveDate,
    pub total_cost: f64,
    pub run_count: usize,
    /// Distinct experiments with at least one run that day.
    pub experiment_count: usize,
    pub total_tokens: u64,
}

#[derive(Default)]
struct DayAccumulator {
    total_cost: f64,
    run_count: usize,
    experiments: BTreeSet<i64>,
    total_tokens: u64,
}

/// The most recent `days` calendar days that have runs, oldest first.
///
/// Runs without a timestamp are left out. Runs whose trial is unknown still
/// count toward cost and tokens but not toward `experiment_count`.
pub fn daily_costs(snapshot: &Snapshot, days: usize) -> Vec<DailyCost> {
    let mut by_day: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
    for run in snapshot.runs() {
        let Some(created_at) = run.created_at else {
            continue;
        };
        let day = by_day.entry(created_at.date()).or_default();
        day.total_cost += run.costs.unwrap_or(0.0);
        day.total_tokens = day.total_tokens.saturating_add(run.tokens.unwrap_or(0));
        day.run_count += 1;
        if let Some(experiment_id) = snapshot.experiment_of_run(run) {
            day.experiments.insert(experiment_id);
        }
    }

    let skip = by_day.len().saturating_sub(days);
    by_day
        .into_iter()
        .skip(skip)
        .map(|(date, acc)| DailyCost {
            date,
            total_cost: acc.total_cost,
            run_count: acc.run_count,
            experiment_count: acc.experiments.len(),
            total_tokens: acc.total_tokens,
        })
        .collect()
}
