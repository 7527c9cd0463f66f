//! # Prometheus Metrics — Exposition for Scrapers
//!
//! Exposes llmobs operational metrics in the Prometheus text exposition format
//! for scraping by Prometheus, Grafana Agent, or any OpenMetrics-compatible collector.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `llmobs_http_request_duration_seconds` | Histogram | `method`, `path` | Request latency |
//! | `llmobs_snapshot_rows` | Gauge | `table` | Rows in the served snapshot |
//! | `llmobs_snapshot_version` | Gauge | — | Version of the served snapshot |
//! | `llmobs_cache_requests_total` | Counter | `cache`, `outcome` | Memo cache lookups |
//! | `llmobs_reloads_total` | Counter | `outcome` | Data reload attempts |
//!
//! ## Integration
//!
//! The HTTP middleware feeds the histogram, [`crate::analytics::MetricsCache`]
//! shares the cache counter family, and the snapshot gauges are refreshed
//! whenever a snapshot is installed. `/metrics` renders the registry on each scrape.

use crate::store::Snapshot;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Label set for HTTP request metrics. `path` is normalized so ids do not
/// explode the label space.
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct TableLabel {
    pub table: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct CacheLabel {
    pub cache: String,
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct OutcomeLabel {
    pub outcome: String,
}

fn request_histogram() -> Histogram {
    // 1ms .. ~16s
    Histogram::new(exponential_buckets(0.001, 2.0, 15))
}

/// Thread-safe metrics registry for the API server.
///
/// All fields use atomic types and are safe to update from any thread or async task.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: Family<HttpLabel, Histogram, fn() -> Histogram>,
    pub snapshot_rows: Family<TableLabel, Gauge>,
    pub snapshot_version: Gauge,
    pub cache_requests: Family<CacheLabel, Counter>,
    pub reloads: Family<OutcomeLabel, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration =
            Family::<HttpLabel, Histogram, fn() -> Histogram>::new_with_constructor(request_histogram);
        registry.register(
            "llmobs_http_request_duration_seconds",
            "HTTP request latency by method and normalized path",
            http_request_duration.clone(),
        );

        let snapshot_rows = Family::<TableLabel, Gauge>::default();
        registry.register(
            "llmobs_snapshot_rows",
            "Rows per table in the served snapshot",
            snapshot_rows.clone(),
        );

        let snapshot_version = Gauge::default();
        registry.register(
            "llmobs_snapshot_version",
            "Version number of the served snapshot",
            snapshot_version.clone(),
        );

        let cache_requests = Family::<CacheLabel, Counter>::default();
        registry.register(
            "llmobs_cache_requests",
            "Metrics cache lookups by entry and outcome",
            cache_requests.clone(),
        );

        let reloads = Family::<OutcomeLabel, Counter>::default();
        registry.register("llmobs_reloads", "Data reload attempts by outcome", reloads.clone());

        Self {
            registry,
            http_request_duration,
            snapshot_rows,
            snapshot_version,
            cache_requests,
            reloads,
        }
    }

    /// Point the snapshot gauges at `snapshot`.
    pub fn observe_snapshot(&self, snapshot: &Snapshot) {
        let counts = [
            ("experiments", snapshot.experiments().len()),
            ("trials", snapshot.trials().len()),
            ("runs", snapshot.runs().len()),
        ];
        for (table, rows) in counts {
            self.snapshot_rows
                .get_or_create(&TableLabel {
                    table: table.to_string(),
                })
                .set(rows as i64);
        }
        self.snapshot_version.set(snapshot.version() as i64);
    }

    pub fn record_reload(&self, ok: bool) {
        let outcome = if ok { "success" } else { "failure" };
        self.reloads
            .get_or_create(&OutcomeLabel {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        if let Err(e) = encode(&mut buf, &self.registry) {
            tracing::error!(error = %e, "failed to encode metrics");
        }
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
