//! Experiment API — paginated listing, detail, trials, and accuracy curve.

use axum::extract::rejection::PathRejection;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::{bad_request, not_found, path_id, AppState};
use crate::query::{self, ExperimentFilter, ExperimentQuery, ExperimentSort, Paginated, SortOrder};
use crate::store::normalize::parse_permissive;
use crate::store::TrialStatus;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub(super) struct ExperimentListQuery {
    page: Option<usize>,
    page_size: Option<usize>,
    name: Option<String>,
    project_id: Option<String>,
    created_after: Option<String>,
    created_before: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

impl ExperimentListQuery {
    /// Validate parameters and turn them into a query-engine request.
    fn into_query(self) -> Result<(ExperimentQuery, usize, usize), String> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err("page must be >= 1".to_string());
        }
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(format!("page_size must be between 1 and {MAX_PAGE_SIZE}"));
        }
        let sort_by = match self.sort_by.as_deref() {
            None => ExperimentSort::CreatedAt,
            Some(s) => ExperimentSort::parse(s).ok_or_else(|| {
                format!("sort_by must be one of {}", ExperimentSort::NAMES.join(", "))
            })?,
        };
        let sort_order = match self.sort_order.as_deref() {
            None => SortOrder::Desc,
            Some(s) => SortOrder::parse(s).ok_or("sort_order must be asc or desc")?,
        };
        let bound = |name: &str, value: Option<String>| match value.filter(|v| !v.trim().is_empty()) {
            None => Ok(None),
            Some(v) => parse_permissive(&v)
                .map(Some)
                .ok_or_else(|| format!("{name} is not a recognized timestamp: {v:?}")),
        };
        let filter = ExperimentFilter {
            name: self.name,
            project_id: self.project_id,
            created_after: bound("created_after", self.created_after)?,
            created_before: bound("created_before", self.created_before)?,
        };
        let query = ExperimentQuery {
            offset: (page - 1).saturating_mul(page_size),
            limit: page_size,
            filter,
            sort_by: Some(sort_by),
            sort_order,
        };
        Ok((query, page, page_size))
    }
}

pub(super) async fn handler_experiments_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExperimentListQuery>,
) -> impl IntoResponse {
    let (query, page, page_size) = match params.into_query() {
        Ok(v) => v,
        Err(msg) => return bad_request(msg),
    };
    let snap = state.store.snapshot();
    let (items, total) = query::list_experiments(&snap, &query);
    Json(Paginated::new(items, total, page, page_size)).into_response()
}

pub(super) async fn handler_experiment_get(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    uri: OriginalUri,
) -> impl IntoResponse {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let snap = state.store.snapshot();
    match query::get_experiment(&snap, id) {
        Some(detail) => Json(detail).into_response(),
        None => not_found("Experiment not found", &uri),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TrialsQuery {
    status: Option<String>,
}

pub(super) async fn handler_experiment_trials(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    Query(params): Query<TrialsQuery>,
) -> impl IntoResponse {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let status = match params.status.as_deref().filter(|s| !s.is_empty()) {
        None => None,
        Some(s) => match s.parse::<TrialStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return bad_request("status must be one of pending, running, finished, failed")
            }
        },
    };
    let snap = state.store.snapshot();
    let trials = query::list_trials(&snap, id, status);
    Json(serde_json::json!({
        "experiment_id": id,
        "total": trials.len(),
        "trials": trials,
    }))
    .into_response()
}

pub(super) async fn handler_accuracy_curve(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> impl IntoResponse {
    let id = match path_id(path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let snap = state.store.snapshot();
    Json(query::accuracy_curve(&snap, id)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ExperimentListQuery {
        ExperimentListQuery {
            page: None,
            page_size: None,
            name: None,
            project_id: None,
            created_after: None,
            created_before: None,
            sort_by: None,
            sort_order: None,
        }
    }

    #[test]
    fn defaults_are_first_page_newest_first() {
        let (q, page, size) = params().into_query().unwrap();
        assert_eq!((page, size), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(q.offset, 0);
        assert_eq!(q.sort_by, Some(ExperimentSort::CreatedAt));
        assert_eq!(q.sort_order, SortOrder::Desc);
    }

    #[test]
    fn offset_follows_page() {
        let p = ExperimentListQuery {
            page: Some(3),
            page_size: Some(10),
            ..params()
        };
        let (q, _, _) = p.into_query().unwrap();
        assert_eq!(q.offset, 20);
        assert_eq!(q.limit, 10);
    }

    #[test]
    fn rejects_out_of_range_and_unknown_values() {
        for p in [
            ExperimentListQuery { page: Some(0), ..params() },
            ExperimentListQuery { page_size: Some(0), ..params() },
            ExperimentListQuery { page_size: Some(101), ..params() },
            ExperimentListQuery { sort_by: Some("id; drop".into()), ..params() },
            ExperimentListQuery { sort_order: Some("up".into()), ..params() },
            ExperimentListQuery { created_after: Some("yesterday".into()), ..params() },
        ] {
            assert!(p.into_query().is_err());
        }
    }

    #[test]
    fn parses_date_bounds() {
        let p = ExperimentListQuery {
            created_after: Some("2024-03-01".into()),
            created_before: Some("2024-03-31T23:59:59".into()),
            ..params()
        };
        let (q, _, _) = p.into_query().unwrap();
        assert!(q.filter.created_after.is_some());
        assert!(q.filter.created_before.is_some());
    }
}
