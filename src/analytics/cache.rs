//! Memoization of the dashboard's two hottest computations.
//!
//! Each entry remembers the snapshot version it was computed from. A read
//! against any other version recomputes, so a reload invalidates everything
//! without the reloader having to know the cache exists. [`MetricsCache::clear`]
//! stays available as a manual override.

use super::stats::{dashboard_stats, DashboardStats};
use crate::prom_metrics::CacheLabel;
use crate::query::{cost_by_experiment, CostByExperiment};
use crate::store::snapshot::lock_or_recover;
use crate::store::Snapshot;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    /// Caching is turned off.
    Bypass,
}

impl CacheOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Bypass => "bypass",
        }
    }
}

struct Entry<T> {
    version: u64,
    value: Arc<T>,
}

struct Slot<T> {
    name: &'static str,
    entry: Mutex<Option<Entry<T>>>,
}

impl<T> Slot<T> {
    fn new(name: &'static str) -> Self {
        Slot {
            name,
            entry: Mutex::new(None),
        }
    }

    fn get_or_compute(&self, version: u64, compute: impl FnOnce() -> T) -> (Arc<T>, CacheOutcome) {
        if let Some(entry) = lock_or_recover(&self.entry).as_ref() {
            if entry.version == version {
                return (Arc::clone(&entry.value), CacheOutcome::Hit);
            }
        }
        // Computed without the lock held; a concurrent miss just does the work twice.
        let value = Arc::new(compute());
        let mut guard = lock_or_recover(&self.entry);
        let newer_present = matches!(guard.as_ref(), Some(e) if e.version > version);
        if !newer_present {
            *guard = Some(Entry {
                version,
                value: Arc::clone(&value),
            });
        }
        (value, CacheOutcome::Miss)
    }

    fn clear(&self) {
        *lock_or_recover(&self.entry) = None;
    }
}

pub struct MetricsCache {
    enabled: bool,
    dashboard: Slot<DashboardStats>,
    cost_breakdown: Slot<Vec<CostByExperiment>>,
    requests: Family<CacheLabel, Counter>,
}

impl MetricsCache {
    pub fn new(enabled: bool) -> Self {
        MetricsCache {
            enabled,
            dashboard: Slot::new("dashboard_stats"),
            cost_breakdown: Slot::new("cost_breakdown"),
            requests: Family::default(),
        }
    }

    /// Count lookups into `requests`, usually the family registered in
    /// [`crate::prom_metrics::Metrics`].
    pub fn with_counters(mut self, requests: Family<CacheLabel, Counter>) -> Self {
        self.requests = requests;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dashboard_stats(&self, snapshot: &Snapshot) -> (Arc<DashboardStats>, CacheOutcome) {
        self.lookup(&self.dashboard, snapshot, dashboard_stats)
    }

    pub fn cost_breakdown(&self, snapshot: &Snapshot) -> (Arc<Vec<CostByExperiment>>, CacheOutcome) {
        self.lookup(&self.cost_breakdown, snapshot, cost_by_experiment)
    }

    /// Drop every entry regardless of version.
    pub fn clear(&self) {
        self.dashboard.clear();
        self.cost_breakdown.clear();
    }

    /// Lookups so far for one entry and outcome.
    pub fn count(&self, cache: &str, outcome: CacheOutcome) -> u64 {
        self.requests
            .get_or_create(&CacheLabel {
                cache: cache.to_string(),
                outcome: outcome.as_str().to_string(),
            })
            .get()
    }

    fn lookup<T>(
        &self,
        slot: &Slot<T>,
        snapshot: &Snapshot,
        compute: fn(&Snapshot) -> T,
    ) -> (Arc<T>, CacheOutcome) {
        let (value, outcome) = if self.enabled {
            slot.get_or_compute(snapshot.version(), || compute(snapshot))
        } else {
            (Arc::new(compute(snapshot)), CacheOutcome::Bypass)
        };
        self.requests
            .get_or_create(&CacheLabel {
                cache: slot.name.to_string(),
                outcome: outcome.as_str().to_string(),
            })
            .inc();
        (value, outcome)
    }
}
