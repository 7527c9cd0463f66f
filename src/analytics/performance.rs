//! Token and latency distribution over all runs.

use super::percentile;
use crate::query::mean;
use crate::store::Snapshot;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub avg_tokens_per_run: f64,
    pub median_latency: f64,
    pub p95_latency: f64,
    pub p99_latency: f64,
    /// Total cost over total tokens.
    pub cost_per_token: f64,
    /// Runs per hour between the earliest and latest run timestamps.
    pub hourly_run_rate: f64,
}

pub fn performance_metrics(snapshot: &Snapshot) -> PerformanceMetrics {
    let runs = snapshot.runs();
    let mut latencies: Vec<f64> = runs.iter().filter_map(|r| r.latency_ms).map(|l| l as f64).collect();

    let total_tokens: u64 = runs.iter().filter_map(|r| r.tokens).fold(0, u64::saturating_add);
    let total_cost: f64 = runs.iter().filter_map(|r| r.costs).sum();
    let cost_per_token = if total_tokens == 0 {
        0.0
    } else {
        total_cost / total_tokens as f64
    };

    let stamps = runs.iter().filter_map(|r| r.created_at);
    let span = stamps
        .clone()
        .min()
        .zip(stamps.clone().max())
        .map(|(first, last)| (last - first).num_seconds() as f64 / 3600.0)
        .unwrap_or(0.0);
    let hourly_run_rate = if span > 0.0 {
        stamps.count() as f64 / span
    } else {
        0.0
    };

    PerformanceMetrics {
        avg_tokens_per_run: mean(runs.iter().filter_map(|r| r.tokens).map(|t| t as f64)).unwrap_or(0.0),
        median_latency: percentile(&mut latencies, 0.5),
        p95_latency: percentile(&mut latencies, 0.95),
        p99_latency: percentile(&mut latencies, 0.99),
        cost_per_token,
        hourly_run_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures;
    use crate::store::Tables;

    #[test]
    fn scenario_distribution() {
        let perf = performance_metrics(&fixtures::scenario());
        assert!((perf.avg_tokens_per_run - 875.0).abs() < 1e-12);
        assert!((perf.median_latency - 250.0).abs() < 1e-12);
        // Latencies 100..400; index 2.85 lands between 300 and 400.
        assert!((perf.p95_latency - 385.0).abs() < 1e-9);
        assert!((perf.cost_per_token - 4.0 / 3500.0).abs() < 1e-12);
        // Four runs between day 4 noon and day 6 noon.
        assert!((perf.hourly_run_rate - 4.0 / 48.0).abs() < 1e-12);
    }

    #[test]
    fn huge_token_counts_do_not_overflow() {
        let perf = performance_metrics(&fixtures::huge_tokens());
        assert!(perf.cost_per_token > 0.0 && perf.cost_per_token.is_finite());
        assert!((perf.avg_tokens_per_run - i64::MAX as f64).abs() / (i64::MAX as f64) < 1e-9);
    }

    #[test]
    fn empty_runs_are_all_zero() {
        let snap = Snapshot::build(1, Tables::default(), Default::default());
        assert_eq!(performance_metrics(&snap), PerformanceMetrics::default());
    }

    #[test]
    fn single_timestamp_has_no_rate() {
        let tables = Tables {
            runs: vec![fixtures::run(1, 1, 0, 0.0, 10, 1)],
            ..Default::default()
        };
        let perf = performance_metrics(&Snapshot::build(1, tables, Default::default()));
        assert_eq!(perf.hourly_run_rate, 0.0);
        assert_eq!(perf.cost_per_token, 0.0);
    }
}
