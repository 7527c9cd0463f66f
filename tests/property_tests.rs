//! Property-based tests for the llmobs query and analytics layers.
//!
//! These tests use `proptest` to generate random but referentially valid
//! experiment/trial/run tables and check invariants that must hold for every
//! snapshot, not just the hand-built fixtures used by the unit tests.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test property_tests
//! PROPTEST_CASES=10000 cargo test --test property_tests
//! ```
//!
//! Each property is named `prop_<function>_<invariant>`.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use llmobs::analytics::{dashboard_stats, percentile};
use llmobs::query::{self, ExperimentQuery, ExperimentSort, SortOrder};
use llmobs::store::{Experiment, Run, Snapshot, Tables, Trial, TrialStatus};
use proptest::prelude::*;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn status_strategy() -> impl Strategy<Value = Option<TrialStatus>> {
    prop_oneof![
        Just(None),
        Just(Some(TrialStatus::Pending)),
        Just(Some(TrialStatus::Running)),
        Just(Some(TrialStatus::Finished)),
        Just(Some(TrialStatus::Failed)),
    ]
}

fn stamp_strategy() -> impl Strategy<Value = Option<NaiveDateTime>> {
    prop::option::weighted(0.9, 0i64..2_000).prop_map(|h| h.map(|h| base() + Duration::hours(h)))
}

prop_compose! {
    fn experiment_strategy()(
        name in "[a-z]{1,6}",
        project in prop::sample::select(vec!["project_a", "project_b"]),
        created_at in stamp_strategy(),
    ) -> Experiment {
        Experiment {
            id: 0,
            name,
            project_id: project.to_string(),
            created_at,
            is_deleted: false,
        }
    }
}

prop_compose! {
    fn trial_strategy()(
        experiment in any::<prop::sample::Index>(),
        status in status_strategy(),
        created_at in stamp_strategy(),
        accuracy in prop::option::of(0.0f64..1.0),
        duration_seconds in prop::option::of(0i64..100_000),
    ) -> (prop::sample::Index, Trial) {
        (experiment, Trial {
            id: 0,
            experiment_id: 0,
            status,
            created_at,
            accuracy,
            duration_seconds,
        })
    }
}

prop_compose! {
    fn run_strategy()(
        trial in any::<prop::sample::Index>(),
        tokens in prop::option::of(0u64..100_000),
        costs in prop::option::of(0.0f64..10.0),
        latency_ms in prop::option::of(1u64..5_000),
        created_at in stamp_strategy(),
    ) -> (prop::sample::Index, Run) {
        (trial, Run {
            id: 0,
            trial_id: 0,
            tokens,
            costs,
            latency_ms,
            created_at,
        })
    }
}

prop_compose! {
    /// Tables with sequential ids where every trial and run points at an existing parent.
    fn tables_strategy()(
        experiments in prop::collection::vec(experiment_strategy(), 1..8),
        trials in prop::collection::vec(trial_strategy(), 1..20),
        runs in prop::collection::vec(run_strategy(), 0..40),
    ) -> Tables {
        let experiments: Vec<Experiment> = experiments
            .into_iter()
            .enumerate()
            .map(|(i, e)| Experiment { id: i as i64 + 1, ..e })
            .collect();
        let trials: Vec<Trial> = trials
            .into_iter()
            .enumerate()
            .map(|(i, (parent, t))| Trial {
                id: i as i64 + 1,
                experiment_id: experiments[parent.index(experiments.len())].id,
                ..t
            })
            .collect();
        let runs: Vec<Run> = runs
            .into_iter()
            .enumerate()
            .map(|(i, (parent, r))| Run {
                id: i as i64 + 1,
                trial_id: trials[parent.index(trials.len())].id,
                ..r
            })
            .collect();
        Tables { experiments, trials, runs }
    }
}

fn snapshot(tables: Tables) -> Snapshot {
    Snapshot::build(1, tables, Default::default())
}

fn sort_strategy() -> impl Strategy<Value = (ExperimentSort, SortOrder)> {
    (
        prop::sample::select(vec![
            ExperimentSort::CreatedAt,
            ExperimentSort::Name,
            ExperimentSort::TotalCost,
        ]),
        prop::sample::select(vec![SortOrder::Asc, SortOrder::Desc]),
    )
}

proptest! {
    /// Walking every page yields exactly the unpaginated listing.
    #[test]
    fn prop_list_experiments_pages_concatenate(
        tables in tables_strategy(),
        page_size in 1usize..5,
        (sort, order) in sort_strategy(),
    ) {
        let snap = snapshot(tables);
        let full_query = ExperimentQuery {
            offset: 0,
            limit: usize::MAX,
            sort_by: Some(sort),
            sort_order: order,
            ..Default::default()
        };
        let (all, total) = query::list_experiments(&snap, &full_query);
        prop_assert_eq!(total, snap.experiments().len());

        let mut walked = Vec::new();
        let pages = total.div_ceil(page_size);
        for page in 0..pages {
            let q = ExperimentQuery {
                offset: page * page_size,
                limit: page_size,
                ..full_query.clone()
            };
            let (items, page_total) = query::list_experiments(&snap, &q);
            prop_assert_eq!(page_total, total);
            prop_assert!(items.len() <= page_size);
            walked.extend(items.into_iter().map(|r| r.experiment.id));
        }
        let expected: Vec<i64> = all.iter().map(|r| r.experiment.id).collect();
        prop_assert_eq!(walked, expected);
    }

    /// Cost percentages sum to 100, or are all zero when nothing was spent.
    #[test]
    fn prop_cost_by_experiment_percentages_sum(tables in tables_strategy()) {
        let snap = snapshot(tables);
        let rows = query::cost_by_experiment(&snap);
        let total_cost: f64 = rows.iter().map(|r| r.total_cost).sum();
        let total_pct: f64 = rows.iter().map(|r| r.percentage).sum();
        if total_cost > 0.0 {
            prop_assert!((total_pct - 100.0).abs() < 1e-6, "sum was {}", total_pct);
        } else {
            prop_assert!(rows.iter().all(|r| r.percentage == 0.0));
        }
        for pair in rows.windows(2) {
            prop_assert!(pair[0].total_cost >= pair[1].total_cost);
        }
    }

    /// Accuracy curves are chronological and contain only finished trials.
    #[test]
    fn prop_accuracy_curve_is_sorted(tables in tables_strategy()) {
        let snap = snapshot(tables);
        for exp in snap.experiments() {
            let curve = query::accuracy_curve(&snap, exp.experiment.id);
            for pair in curve.windows(2) {
                prop_assert!(pair[0].timestamp <= pair[1].timestamp);
            }
            for point in &curve {
                let trial = snap.trial(point.trial_id).unwrap();
                prop_assert_eq!(trial.trial.status, Some(TrialStatus::Finished));
            }
        }
    }

    /// Dashboard rates and counts stay within their natural bounds.
    #[test]
    fn prop_dashboard_stats_bounded(tables in tables_strategy()) {
        let snap = snapshot(tables);
        let stats = dashboard_stats(&snap);
        prop_assert!((0.0..=100.0).contains(&stats.success_rate));
        prop_assert!(stats.active_trials + stats.failed_trials <= stats.total_trials);
        if let Some(acc) = stats.avg_accuracy {
            prop_assert!((0.0..=1.0).contains(&acc));
        }
    }

    /// Rollups conserve totals: every run's cost lands in exactly one trial and one experiment.
    #[test]
    fn prop_rollups_conserve_cost_and_counts(tables in tables_strategy()) {
        let run_cost: f64 = tables.runs.iter().filter_map(|r| r.costs).sum();
        let run_count = tables.runs.len() as u64;
        let snap = snapshot(tables);

        let trial_cost: f64 = snap.trials().iter().map(|t| t.rollup.total_cost).sum();
        let trial_runs: u64 = snap.trials().iter().map(|t| t.rollup.run_count).sum();
        let exp_cost: f64 = snap.experiments().iter().map(|e| e.rollup.total_cost).sum();
        let exp_runs: u64 = snap.experiments().iter().map(|e| e.rollup.total_runs).sum();
        let exp_trials: u64 = snap.experiments().iter().map(|e| e.rollup.total_trials).sum();

        prop_assert!((trial_cost - run_cost).abs() < 1e-6);
        prop_assert!((exp_cost - run_cost).abs() < 1e-6);
        prop_assert_eq!(trial_runs, run_count);
        prop_assert_eq!(exp_runs, run_count);
        prop_assert_eq!(exp_trials, snap.trials().len() as u64);
    }

    /// Rebuilding from the same tables gives the same records.
    #[test]
    fn prop_snapshot_build_is_deterministic(tables in tables_strategy()) {
        let a = snapshot(tables.clone());
        let b = snapshot(tables);
        prop_assert_eq!(a.experiments(), b.experiments());
        prop_assert_eq!(a.trials(), b.trials());
    }

    /// Percentiles lie between the minimum and maximum and grow with `pct`.
    #[test]
    fn prop_percentile_bounded_and_monotone(
        mut data in prop::collection::vec(0.0f64..1e6, 1..50),
        lo in 0.0f64..1.0,
        hi in 0.0f64..1.0,
    ) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let p_lo = percentile(&mut data, lo);
        let p_hi = percentile(&mut data, hi);
        prop_assert!(p_lo >= min - 1e-9 && p_hi <= max + 1e-9);
        prop_assert!(p_lo <= p_hi + 1e-9);
    }
}
