use super::cache::MetricsCache;
use super::stats::DashboardStats;
use super::trends::{trends, Trends};
use crate::query::CostByExperiment;
use crate::store::Snapshot;
use serde::Serialize;

pub const TOP_COSTS: usize = 5;

/// Everything the landing page needs in one response.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub snapshot_version: u64,
    pub dashboard: DashboardStats,
    pub trends: Trends,
    pub top_costs: Vec<CostByExperiment>,
}

/// Builds the summary, taking dashboard stats and the cost breakdown from
/// `cache` so a summary request warms the same entries as the dashboard.
pub fn summarize(snapshot: &Snapshot, cache: &MetricsCache) -> Summary {
    let (dashboard, _) = cache.dashboard_stats(snapshot);
    let (costs, _) = cache.cost_breakdown(snapshot);
    Summary {
        snapshot_version: snapshot.version(),
        dashboard: DashboardStats::clone(&dashboard),
        trends: trends(snapshot),
        top_costs: costs.iter().take(TOP_COSTS).cloned().collect(),
    }
}
