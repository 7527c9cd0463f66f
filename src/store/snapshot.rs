//! Immutable snapshot of the three tables and the handle that swaps it.
//!
//! A [`Snapshot`] is built once from base [`Tables`]: rollups are merged on,
//! id and foreign-key indices are computed, and a version number is stamped.
//! Nothing mutates it afterwards. [`Store`] holds the current snapshot behind
//! an `RwLock<Arc<_>>`; readers clone the `Arc` and drop the lock at once, so
//! a reload never tears a read in half.

use super::aggregate::{augment_experiments, augment_trials};
use super::normalize::ParseReport;
use super::types::{ExperimentRecord, Run, Tables, TrialRecord};
use super::DataPaths;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::info;

/// Lock a mutex, recovering from poisoning.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Normalizer reports for the three files that produced a snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub experiments: ParseReport,
    pub trials: ParseReport,
    pub runs: ParseReport,
}

pub struct Snapshot {
    version: u64,
    loaded_at: DateTime<Utc>,
    experiments: Vec<ExperimentRecord>,
    trials: Vec<TrialRecord>,
    runs: Vec<Run>,
    experiment_index: HashMap<i64, usize>,
    trial_index: HashMap<i64, usize>,
    trials_by_experiment: HashMap<i64, Vec<usize>>,
    runs_by_trial: HashMap<i64, Vec<usize>>,
    report: LoadReport,
}

/// First occurrence wins when an id repeats.
fn index_by<T>(rows: &[T], key: impl Fn(&T) -> i64) -> HashMap<i64, usize> {
    let mut index = HashMap::with_capacity(rows.len());
    for (pos, row) in rows.iter().enumerate() {
        index.entry(key(row)).or_insert(pos);
    }
    index
}

fn group_by<T>(rows: &[T], key: impl Fn(&T) -> i64) -> HashMap<i64, Vec<usize>> {
    let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
    for (pos, row) in rows.iter().enumerate() {
        groups.entry(key(row)).or_default().push(pos);
    }
    groups
}

impl Snapshot {
    pub fn build(version: u64, tables: Tables, report: LoadReport) -> Self {
        let trials = augment_trials(&tables.trials, &tables.runs);
        let experiments = augment_experiments(&tables.experiments, &trials);
        let runs = tables.runs;

        Snapshot {
            version,
            loaded_at: Utc::now(),
            experiment_index: index_by(&experiments, |e| e.experiment.id),
            trial_index: index_by(&trials, |t| t.trial.id),
            trials_by_experiment: group_by(&trials, |t| t.trial.experiment_id),
            runs_by_trial: group_by(&runs, |r| r.trial_id),
            experiments,
            trials,
            runs,
            report,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn experiments(&self) -> &[ExperimentRecord] {
        &self.experiments
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn experiment(&self, id: i64) -> Option<&ExperimentRecord> {
        self.experiment_index.get(&id).map(|&pos| &self.experiments[pos])
    }

    pub fn trial(&self, id: i64) -> Option<&TrialRecord> {
        self.trial_index.get(&id).map(|&pos| &self.trials[pos])
    }

    /// Trials of one experiment, in table order.
    pub fn trials_for(&self, experiment_id: i64) -> impl Iterator<Item = &TrialRecord> + '_ {
        self.trials_by_experiment
            .get(&experiment_id)
            .into_iter()
            .flatten()
            .map(move |&pos| &self.trials[pos])
    }

    /// Runs of one trial, in table order.
    pub fn runs_for(&self, trial_id: i64) -> impl Iterator<Item = &Run> + '_ {
        self.runs_by_trial
            .get(&trial_id)
            .into_iter()
            .flatten()
            .map(move |&pos| &self.runs[pos])
    }

    /// Experiment a run belongs to, through its trial. `None` for orphans.
    pub fn experiment_of_run(&self, run: &Run) -> Option<i64> {
        self.trial(run.trial_id).map(|t| t.trial.experiment_id)
    }
}

/// Shared handle to the current snapshot.
pub struct Store {
    current: RwLock<Arc<Snapshot>>,
    reload_lock: Mutex<()>,
    source: Option<DataPaths>,
}

impl Store {
    /// Load the data directory and wrap the result as version 1.
    pub fn open(paths: DataPaths) -> Result<Self> {
        let (tables, report) = super::load_tables(&paths)?;
        let snapshot = Snapshot::build(1, tables, report);
        log_snapshot(&snapshot);
        Ok(Store {
            current: RwLock::new(Arc::new(snapshot)),
            reload_lock: Mutex::new(()),
            source: Some(paths),
        })
    }

    /// A store over in-memory tables with no backing files; `reload` fails.
    pub fn from_tables(tables: Tables) -> Self {
        Store {
            current: RwLock::new(Arc::new(Snapshot::build(1, tables, LoadReport::default()))),
            reload_lock: Mutex::new(()),
            source: None,
        }
    }

    /// The current snapshot. Hold on to the returned `Arc` for the whole
    /// computation rather than calling this repeatedly.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in new tables as the next version.
    pub fn replace(&self, tables: Tables, report: LoadReport) -> Arc<Snapshot> {
        let _reload = lock_or_recover(&self.reload_lock);
        self.install(tables, report)
    }

    /// Re-read the backing files. On failure the current snapshot stays.
    pub fn reload(&self) -> Result<Arc<Snapshot>> {
        let _reload = lock_or_recover(&self.reload_lock);
        let paths = self
            .source
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("store has no backing data directory"))?;
        let (tables, report) = super::load_tables(paths)?;
        let snapshot = self.install(tables, report);
        log_snapshot(&snapshot);
        Ok(snapshot)
    }

    fn install(&self, tables: Tables, report: LoadReport) -> Arc<Snapshot> {
        // Build outside the write lock; readers keep the old snapshot meanwhile.
        let next_version = self.snapshot().version() + 1;
        let snapshot = Arc::new(Snapshot::build(next_version, tables, report));
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&snapshot);
        snapshot
    }
}

fn log_snapshot(snapshot: &Snapshot) {
    info!(
        version = snapshot.version(),
        experiments = snapshot.experiments().len(),
        trials = snapshot.trials().len(),
        runs = snapshot.runs().len(),
        "snapshot loaded"
    );
}
