//! Free-text search across experiments and trials, plus name autocomplete.

use crate::store::{ExperimentRecord, Snapshot, TrialRecord};
use serde::Serialize;
use std::collections::BTreeSet;

/// Shortest query or prefix that produces any results.
pub const MIN_QUERY_LEN: usize = 2;
/// Upper bound on hits per entity, whatever the caller asks for.
pub const MAX_HITS_PER_ENTITY: usize = 10;
pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults<'a> {
    pub query: String,
    pub experiments: Vec<&'a ExperimentRecord>,
    pub trials: Vec<&'a TrialRecord>,
    pub total: usize,
}

/// Case-insensitive substring match against experiment name and project,
/// and against trial status.
pub fn search<'a>(snapshot: &'a Snapshot, query: &str, limit: usize) -> SearchResults<'a> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_LEN {
        return SearchResults {
            query: query.to_string(),
            ..Default::default()
        };
    }
    let needle = query.to_lowercase();
    let cap = limit.min(MAX_HITS_PER_ENTITY);

    let experiments: Vec<&ExperimentRecord> = snapshot
        .experiments()
        .iter()
        .filter(|r| {
            r.experiment.name.to_lowercase().contains(&needle)
                || r.experiment.project_id.to_lowercase().contains(&needle)
        })
        .take(cap)
        .collect();
    let trials: Vec<&TrialRecord> = snapshot
        .trials()
        .iter()
        .filter(|r| r.trial.status.is_some_and(|s| s.as_str().contains(&needle)))
        .take(cap)
        .collect();

    SearchResults {
        query: query.to_string(),
        total: experiments.len() + trials.len(),
        experiments,
        trials,
    }
}

/// Sorted, de-duplicated experiment names and project ids starting with `prefix`.
pub fn suggestions(snapshot: &Snapshot, prefix: &str) -> Vec<String> {
    let prefix = prefix.trim();
    if prefix.chars().count() < MIN_QUERY_LEN {
        return Vec::new();
    }
    let needle = prefix.to_lowercase();
    let mut found = BTreeSet::new();
    for r in snapshot.experiments() {
        for candidate in [&r.experiment.name, &r.experiment.project_id] {
            if candidate.to_lowercase().starts_with(&needle) {
                found.insert(candidate.clone());
            }
        }
    }
    found.into_iter().take(MAX_SUGGESTIONS).collect()
}
