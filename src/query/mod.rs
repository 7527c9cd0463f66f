//! # Query — Read Operations over a Snapshot
//!
//! Every function here takes a `&Snapshot` and returns borrowed rows or small
//! owned summaries. Nothing blocks, nothing mutates, and lookups that miss
//! return `None` rather than an error.
//!
//! ## Module Structure
//!
//! - [`experiments`] — filtered/sorted/paginated experiment listing and detail
//! - [`trials`] — trials per experiment, trial detail, runs, run stats, accuracy curve
//! - [`costs`] — cost breakdown per experiment and daily cost series
//! - [`search`] — free-text search and autocomplete

pub mod costs;
pub mod experiments;
pub mod search;
pub mod trials;

pub use costs::*;
pub use experiments::*;
pub use search::*;
pub use trials::*;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Compare optional keys with missing values last in either direction.
pub(crate) fn cmp_nulls_last<T: PartialOrd>(a: &Option<T>, b: &Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => order.apply(x.partial_cmp(y).unwrap_or(Ordering::Equal)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One page of a listing plus the information needed to fetch the rest.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: usize, page: usize, page_size: usize) -> Self {
        let total_pages = if page_size == 0 { 0 } else { total.div_ceil(page_size) };
        Paginated {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// Mean of an iterator of values, `None` when empty.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(Paginated::<u8>::new(vec![], 0, 1, 20).total_pages, 0);
        assert_eq!(Paginated::<u8>::new(vec![], 20, 1, 20).total_pages, 1);
        assert_eq!(Paginated::<u8>::new(vec![], 21, 1, 20).total_pages, 2);
    }

    #[test]
    fn nulls_sort_last_both_ways() {
        let mut v = vec![None, Some(2), Some(1)];
        v.sort_by(|a, b| cmp_nulls_last(a, b, SortOrder::Asc));
        assert_eq!(v, vec![Some(1), Some(2), None]);
        v.sort_by(|a, b| cmp_nulls_last(a, b, SortOrder::Desc));
        assert_eq!(v, vec![Some(2), Some(1), None]);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(mean([1.0, 2.0, 3.0]), Some(2.0));
    }
}
