//! Operational endpoints: cache invalidation and data reload.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;
use tracing::{error, info};

use super::AppState;

pub(super) async fn handler_cache_clear(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.cache.clear();
    info!("metrics cache cleared");
    Json(serde_json::json!({"message": "Cache cleared successfully"}))
}

/// Re-read the CSV files. The old snapshot keeps serving if anything fails.
pub(super) async fn handler_reload(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reload_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || reload_state.store.reload()).await;
    let outcome = match result {
        Ok(inner) => inner,
        Err(e) => Err(anyhow::anyhow!("reload task failed: {e}")),
    };
    match outcome {
        Ok(snap) => {
            state.prom_metrics.record_reload(true);
            state.prom_metrics.observe_snapshot(&snap);
            state.cache.clear();
            info!(version = snap.version(), "data reloaded");
            Json(serde_json::json!({
                "message": "Data reloaded",
                "snapshot_version": snap.version(),
                "experiments": snap.experiments().len(),
                "trials": snap.trials().len(),
                "runs": snap.runs().len(),
                "load_report": snap.report(),
            }))
            .into_response()
        }
        Err(e) => {
            state.prom_metrics.record_reload(false);
            error!(error = %format!("{e:#}"), "reload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("Reload failed: {e:#}"),
                    "snapshot_version": state.store.snapshot().version(),
                })),
            )
                .into_response()
        }
    }
}
