//! Flags runs that cost far more than usual and experiments that keep failing.

use super::percentile;
use crate::store::{Snapshot, TrialStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Runs above this percentile of all run costs are flagged.
pub const HIGH_COST_PERCENTILE: f64 = 0.95;
/// Experiments with more failed trials than this are flagged.
pub const FAILED_TRIALS_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anomaly {
    HighCost {
        run_id: i64,
        trial_id: i64,
        value: f64,
        threshold: f64,
        severity: Severity,
    },
    HighFailureRate {
        experiment_id: i64,
        failed_count: usize,
        severity: Severity,
    },
}

impl Anomaly {
    pub fn severity(&self) -> Severity {
        match self {
            Anomaly::HighCost { severity, .. } | Anomaly::HighFailureRate { severity, .. } => *severity,
        }
    }
}

/// High-cost runs in table order, then failure-heavy experiments by id.
pub fn detect_anomalies(snapshot: &Snapshot) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    let mut costs: Vec<f64> = snapshot.runs().iter().filter_map(|r| r.costs).collect();
    if !costs.is_empty() {
        let threshold = percentile(&mut costs, HIGH_COST_PERCENTILE);
        for run in snapshot.runs() {
            if let Some(value) = run.costs.filter(|&c| c > threshold) {
                anomalies.push(Anomaly::HighCost {
                    run_id: run.id,
                    trial_id: run.trial_id,
                    value,
                    threshold,
                    severity: Severity::Warning,
                });
            }
        }
    }

    let mut failed: BTreeMap<i64, usize> = BTreeMap::new();
    for t in snapshot.trials() {
        if t.trial.status == Some(TrialStatus::Failed) {
            *failed.entry(t.trial.experiment_id).or_default() += 1;
        }
    }
    anomalies.extend(
        failed
            .into_iter()
            .filter(|&(_, count)| count > FAILED_TRIALS_LIMIT)
            .map(|(experiment_id, failed_count)| Anomaly::HighFailureRate {
                experiment_id,
                failed_count,
                severity: Severity::Critical,
            }),
    );

    anomalies
}
