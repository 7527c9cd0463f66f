//! Experiment listing and detail.

use super::{cmp_nulls_last, SortOrder};
use crate::store::{ExperimentRecord, Snapshot, TrialStatus};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentFilter {
    /// Case-insensitive substring of the experiment name.
    pub name: Option<String>,
    pub project_id: Option<String>,
    pub created_after: Option<NaiveDateTime>,
    pub created_before: Option<NaiveDateTime>,
}

impl ExperimentFilter {
    pub fn matches(&self, record: &ExperimentRecord) -> bool {
        let e = &record.experiment;
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            if !e.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(project) = self.project_id.as_deref().filter(|p| !p.is_empty()) {
            if e.project_id != project {
                return false;
            }
        }
        // A row with no timestamp never satisfies a date bound.
        if let Some(after) = self.created_after {
            if !e.created_at.is_some_and(|t| t >= after) {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if !e.created_at.is_some_and(|t| t <= before) {
                return false;
            }
        }
        true
    }
}

/// Whitelisted sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentSort {
    CreatedAt,
    Name,
    TotalCost,
}

impl ExperimentSort {
    pub const NAMES: [&'static str; 3] = ["created_at", "name", "total_cost"];

    /// Unknown columns yield `None`, which leaves the listing in load order.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created_at" => Some(ExperimentSort::CreatedAt),
            "name" => Some(ExperimentSort::Name),
            "total_cost" => Some(ExperimentSort::TotalCost),
            _ => None,
        }
    }

    fn compare(self, a: &ExperimentRecord, b: &ExperimentRecord, order: SortOrder) -> Ordering {
        match self {
            ExperimentSort::CreatedAt => {
                cmp_nulls_last(&a.experiment.created_at, &b.experiment.created_at, order)
            }
            ExperimentSort::Name => {
                order.apply(a.experiment.name.cmp(&b.experiment.name))
            }
            ExperimentSort::TotalCost => {
                order.apply(a.rollup.total_cost.total_cmp(&b.rollup.total_cost))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExperimentQuery {
    pub offset: usize,
    pub limit: usize,
    pub filter: ExperimentFilter,
    pub sort_by: Option<ExperimentSort>,
    pub sort_order: SortOrder,
}

impl Default for ExperimentQuery {
    fn default() -> Self {
        ExperimentQuery {
            offset: 0,
            limit: 20,
            filter: ExperimentFilter::default(),
            sort_by: Some(ExperimentSort::CreatedAt),
            sort_order: SortOrder::Desc,
        }
    }
}

/// Filter, sort, and slice the experiment table.
///
/// Returns the page and the number of rows that matched before slicing.
/// Sorting is stable, so ties keep load order.
pub fn list_experiments<'a>(
    snapshot: &'a Snapshot,
    query: &ExperimentQuery,
) -> (Vec<&'a ExperimentRecord>, usize) {
    let mut rows: Vec<&ExperimentRecord> = snapshot
        .experiments()
        .iter()
        .filter(|r| query.filter.matches(r))
        .collect();
    if let Some(sort) = query.sort_by {
        rows.sort_by(|a, b| sort.compare(a, b, query.sort_order));
    }
    let total = rows.len();
    let page = rows
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();
    (page, total)
}

/// An experiment plus trial status counts.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentDetail<'a> {
    #[serde(flatten)]
    pub record: &'a ExperimentRecord,
    pub finished_trials: usize,
    pub failed_trials: usize,
}

pub fn get_experiment(snapshot: &Snapshot, id: i64) -> Option<ExperimentDetail<'_>> {
    let record = snapshot.experiment(id)?;
    let count = |status: TrialStatus| {
        snapshot
            .trials_for(id)
            .filter(|t| t.trial.status == Some(status))
            .count()
    };
    Some(ExperimentDetail {
        record,
        finished_trials: count(TrialStatus::Finished),
        failed_trials: count(TrialStatus::Failed),
    })
}
