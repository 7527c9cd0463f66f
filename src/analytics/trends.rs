//! Direction-of-travel signals.

use super::rolling_means;
use crate::query::{cmp_nulls_last, daily_costs, mean, SortOrder};
use crate::store::{Snapshot, TrialRecord};
use serde::Serialize;

pub const ACCURACY_WINDOW: usize = 5;
pub const COST_TREND_DAYS: usize = 7;
pub const VELOCITY_WINDOW_DAYS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trends {
    /// `None` until there are enough finished trials to fill one window.
    pub accuracy_improving: Option<bool>,
    pub cost_trend: CostTrend,
    pub avg_trial_duration: Option<f64>,
    /// Experiment count spread over a fixed 30-day window.
    pub experiment_velocity: f64,
}

pub fn trends(snapshot: &Snapshot) -> Trends {
    Trends {
        accuracy_improving: accuracy_improving(snapshot),
        cost_trend: cost_trend(snapshot),
        avg_trial_duration: mean(
            snapshot
                .trials()
                .iter()
                .filter_map(|t| t.trial.duration_seconds)
                .map(|d| d as f64),
        ),
        experiment_velocity: experiment_velocity(snapshot),
    }
}

/// Compares the latest rolling mean of finished-trial accuracy with the one
/// four positions earlier. A series too short to reach back that far is
/// reported as not improving.
fn accuracy_improving(snapshot: &Snapshot) -> Option<bool> {
    let mut finished: Vec<&TrialRecord> = snapshot
        .trials()
        .iter()
        .filter(|t| t.trial.finished_accuracy().is_some())
        .collect();
    finished.sort_by(|a, b| cmp_nulls_last(&a.trial.created_at, &b.trial.created_at, SortOrder::Asc));
    let values: Vec<f64> = finished.iter().filter_map(|t| t.trial.finished_accuracy()).collect();

    let means = rolling_means(&values, ACCURACY_WINDOW);
    let last = means.len().checked_sub(1)?;
    let Some(earlier) = last.checked_sub(ACCURACY_WINDOW - 1) else {
        return Some(false);
    };
    Some(means[last] > means[earlier])
}

fn cost_trend(snapshot: &Snapshot) -> CostTrend {
    let days = daily_costs(snapshot, COST_TREND_DAYS);
    match (days.first(), days.last()) {
        (Some(first), Some(last)) if days.len() >= 2 => {
            if last.total_cost > first.total_cost {
                CostTrend::Increasing
            } else if last.total_cost < first.total_cost {
                CostTrend::Decreasing
            } else {
                CostTrend::Stable
            }
        }
        _ => CostTrend::Stable,
    }
}

fn experiment_velocity(snapshot: &Snapshot) -> f64 {
    snapshot.experiments().len() as f64 / VELOCITY_WINDOW_DAYS as f64
}
