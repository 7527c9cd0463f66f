use axum::extract::rejection::PathRejection;
use axum::extract::{OriginalUri, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use super::{not_found, path_id, AppState};
use crate::query;

pub(super) async fn handler_trial_get(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    uri: OriginalUri,
) -> impl IntoResponse {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let snap = state.store.snapshot();
    match query::get_trial(&snap, id) {
        Some(detail) => Json(detail).into_response(),
        None => not_found("Trial not found", &uri),
    }
}

/// Runs plus their stats. An unknown trial yields an empty list, not a 404.
pub(super) async fn handler_trial_runs(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> impl IntoResponse {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let snap = state.store.snapshot();
    let runs = query::list_runs(&snap, id);
    let stats = query::trial_stats(&snap, id);
    Json(serde_json::json!({
        "trial_id": id,
        "total": runs.len(),
        "runs": runs,
        "stats": stats,
    }))
    .into_response()
}

pub(super) async fn handler_trial_stats(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> impl IntoResponse {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let snap = state.store.snapshot();
    Json(query::trial_stats(&snap, id)).into_response()
}
