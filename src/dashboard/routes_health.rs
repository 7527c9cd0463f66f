//! # Health & Observability Endpoints
//!
//! | Endpoint | Purpose |
//! |----------|---------|
//! | `GET /` | Service name, version, and entry points |
//! | `GET /healthz` | Liveness: the process is serving HTTP |
//! | `GET /metrics` | Prometheus scraping endpoint |
//! | `GET {prefix}/health` | Liveness with API version |
//! | `GET {prefix}/status` | Snapshot version, load time, row counts, parse report |

use super::{AppState, SERVICE_NAME, SERVICE_VERSION};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

pub async fn handler_root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let prefix = &state.config.api_prefix;
    Json(serde_json::json!({
        "name": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "status": "running",
        "endpoints": {
            "dashboard": format!("{prefix}/dashboard/stats"),
            "experiments": format!("{prefix}/experiments"),
            "search": format!("{prefix}/search"),
            "health": format!("{prefix}/health"),
            "status": format!("{prefix}/status"),
            "metrics": "/metrics",
        },
    }))
}

/// Liveness probe: no dependencies checked. Once the server is up the
/// snapshot is loaded, so serving HTTP means healthy.
pub async fn handler_healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn handler_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": SERVICE_VERSION,
        "snapshot_version": state.store.snapshot().version(),
    }))
}

pub async fn handler_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.store.snapshot();
    Json(serde_json::json!({
        "status": "operational",
        "version": SERVICE_VERSION,
        "snapshot_version": snap.version(),
        "loaded_at": snap.loaded_at(),
        "started_at": state.started_at,
        "experiments_count": snap.experiments().len(),
        "trials_count": snap.trials().len(),
        "runs_count": snap.runs().len(),
        "cache_enabled": state.cache.is_enabled(),
        "load_report": snap.report(),
    }))
}

/// Prometheus metrics endpoint: returns all metrics in text exposition format.
pub async fn handler_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.prom_metrics.encode();
    (
        StatusCode::OK,
        [(
            "content-type",
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    )
}
