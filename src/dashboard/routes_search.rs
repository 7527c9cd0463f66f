use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::{bad_request, AppState};
use crate::query::{self, MIN_QUERY_LEN};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 100;
pub const MAX_PREFIX_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    q: Option<String>,
    limit: Option<usize>,
}

pub(super) async fn handler_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> impl IntoResponse {
    let q = params.q.unwrap_or_default();
    if q.trim().chars().count() < MIN_QUERY_LEN {
        return bad_request(format!("q must be at least {MIN_QUERY_LEN} characters"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
        return bad_request(format!("limit must be between 1 and {MAX_SEARCH_LIMIT}"));
    }
    let snap = state.store.snapshot();
    Json(query::search(&snap, &q, limit)).into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct SuggestionsQuery {
    prefix: Option<String>,
}

pub(super) async fn handler_suggestions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionsQuery>,
) -> impl IntoResponse {
    let prefix = params.prefix.unwrap_or_default();
    let len = prefix.trim().chars().count();
    if !(MIN_QUERY_LEN..=MAX_PREFIX_LEN).contains(&len) {
        return bad_request(format!(
            "prefix must be between {MIN_QUERY_LEN} and {MAX_PREFIX_LEN} characters"
        ));
    }
    let snap = state.store.snapshot();
    Json(query::suggestions(&snap, &prefix)).into_response()
}
