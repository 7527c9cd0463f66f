//! Dashboard KPIs, cost views, and the analytics endpoints.
//!
//! `stats` and `cost-breakdown` go through the memo cache; everything else is
//! recomputed per request.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::{bad_request, AppState};
use crate::analytics;
use crate::query;

pub const DEFAULT_DAYS: usize = 30;
pub const MAX_DAYS: usize = 365;

pub(super) async fn handler_dashboard_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.store.snapshot();
    let (stats, _) = state.cache.dashboard_stats(&snap);
    Json(&*stats).into_response()
}

pub(super) async fn handler_cost_breakdown(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.store.snapshot();
    let (rows, _) = state.cache.cost_breakdown(&snap);
    Json(&*rows).into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct DaysQuery {
    days: Option<usize>,
}

pub(super) async fn handler_daily_costs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DaysQuery>,
) -> impl IntoResponse {
    let days = params.days.unwrap_or(DEFAULT_DAYS);
    if !(1..=MAX_DAYS).contains(&days) {
        return bad_request(format!("days must be between 1 and {MAX_DAYS}"));
    }
    let snap = state.store.snapshot();
    Json(query::daily_costs(&snap, days)).into_response()
}

pub(super) async fn handler_performance(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(analytics::performance_metrics(&state.store.snapshot()))
}

pub(super) async fn handler_anomalies(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(analytics::detect_anomalies(&state.store.snapshot()))
}

pub(super) async fn handler_trends(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(analytics::trends(&state.store.snapshot()))
}

pub(super) async fn handler_summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.store.snapshot();
    Json(analytics::summarize(&snap, &state.cache))
}
