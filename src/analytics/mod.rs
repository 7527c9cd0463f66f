//! # Analytics — Dashboard KPIs, Percentiles, Anomalies, Trends
//!
//! Whole-snapshot computations layered on top of [`crate::query`]. Each
//! function is pure over a `&Snapshot`; [`cache::MetricsCache`] memoizes the
//! two that the dashboard hits on every page load.
//!
//! Undefined statistics (empty inputs, zero denominators) come out as `0` or
//! `None`, never NaN.
//!
//! ## Module Structure
//!
//! - [`stats`] — headline dashboard numbers
//! - [`performance`] — token and latency distribution
//! - [`anomalies`] — high-cost runs and failure-heavy experiments
//! - [`trends`] — accuracy and cost direction, trial duration, velocity
//! - [`summary`] — stats + trends + top costs in one payload
//! - [`cache`] — snapshot-version-tagged memoization

pub mod anomalies;
pub mod cache;
pub mod performance;
pub mod stats;
pub mod summary;
pub mod trends;

pub use anomalies::{detect_anomalies, Anomaly, Severity};
pub use cache::{CacheOutcome, MetricsCache};
pub use performance::{performance_metrics, PerformanceMetrics};
pub use stats::{dashboard_stats, DashboardStats};
pub use summary::{summarize, Summary};
pub use trends::{trends, CostTrend, Trends};

/// Linearly interpolated percentile, `pct` in `0.0..=1.0`. Sorts `data` in place.
pub fn percentile(data: &mut [f64], pct: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.sort_by(f64::total_cmp);
    let idx = (data.len() - 1) as f64 * pct.clamp(0.0, 1.0);
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    if lower == upper {
        data[lower]
    } else {
        let w = idx - lower as f64;
        data[lower] * (1.0 - w) + data[upper] * w
    }
}

/// Means of every full window of `window` consecutive values.
///
/// The result has `values.len() - window + 1` entries, or none when there
/// are fewer values than the window.
pub fn rolling_means(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let mut data = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&mut data, 0.0), 1.0);
        assert_eq!(percentile(&mut data, 1.0), 4.0);
        assert!((percentile(&mut data, 0.5) - 2.5).abs() < 1e-12);
        // Index 2.85 between 3.0 and 4.0.
        assert!((percentile(&mut data, 0.95) - 3.85).abs() < 1e-12);
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile(&mut [], 0.95), 0.0);
        assert_eq!(percentile(&mut [7.0], 0.95), 7.0);
    }

    #[test]
    fn rolling_means_cover_full_windows_only() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(rolling_means(&values, 5), vec![3.0, 4.0]);
        assert!(rolling_means(&values[..4], 5).is_empty());
        assert!(rolling_means(&values, 0).is_empty());
    }
}
