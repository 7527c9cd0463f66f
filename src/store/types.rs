//! Row types for the three canonical tables and their rollups.
//!
//! Base rows (`Experiment`, `Trial`, `Run`) mirror the normalized CSV columns.
//! Records (`ExperimentRecord`, `TrialRecord`) are base rows with the rollup
//! columns merged on; they are what the query layer serves.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    Pending,
    Running,
    Finished,
    Failed,
}

impl TrialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialStatus::Pending => "pending",
            TrialStatus::Running => "running",
            TrialStatus::Finished => "finished",
            TrialStatus::Failed => "failed",
        }
    }

    /// Pending and running trials count as active on the dashboard.
    pub fn is_active(&self) -> bool {
        matches!(self, TrialStatus::Pending | TrialStatus::Running)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrialStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TrialStatus::Pending),
            "running" => Ok(TrialStatus::Running),
            "finished" => Ok(TrialStatus::Finished),
            "failed" => Ok(TrialStatus::Failed),
            other => Err(anyhow::anyhow!("unknown trial status: {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Experiment {
    pub id: i64,
    pub name: String,
    pub project_id: String,
    pub created_at: Option<NaiveDateTime>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trial {
    pub id: i64,
    pub experiment_id: i64,
    /// `None` when the source cell held something other than the four known states.
    pub status: Option<TrialStatus>,
    pub created_at: Option<NaiveDateTime>,
    pub accuracy: Option<f64>,
    pub duration_seconds: Option<i64>,
}

impl Trial {
    pub fn is_finished(&self) -> bool {
        self.status == Some(TrialStatus::Finished)
    }

    /// Accuracy only when the trial finished; the column is meaningless otherwise.
    pub fn finished_accuracy(&self) -> Option<f64> {
        if self.is_finished() {
            self.accuracy
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub id: i64,
    pub trial_id: i64,
    pub tokens: Option<u64>,
    pub costs: Option<f64>,
    pub latency_ms: Option<u64>,
    pub created_at: Option<NaiveDateTime>,
}

impl Run {
    /// Cost divided by tokens, or 0 when the run used no tokens.
    pub fn cost_per_token(&self) -> f64 {
        match self.tokens {
            Some(tokens) if tokens > 0 => self.costs.unwrap_or(0.0) / tokens as f64,
            _ => 0.0,
        }
    }
}

/// Run-level measurements folded up to one trial. Zero-filled when a trial has no runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrialRollup {
    pub total_cost: f64,
    pub total_tokens: u64,
    #[serde(rename = "avg_latency")]
    pub avg_latency_ms: f64,
    #[serde(rename = "total_runs")]
    pub run_count: u64,
}

/// Trial-level values folded up to one experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExperimentRollup {
    pub total_trials: u64,
    pub total_runs: u64,
    pub total_cost: f64,
    pub avg_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    #[serde(flatten)]
    pub trial: Trial,
    #[serde(flatten)]
    pub rollup: TrialRollup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentRecord {
    #[serde(flatten)]
    pub experiment: Experiment,
    #[serde(flatten)]
    pub rollup: ExperimentRollup,
}

/// The three base tables as they come out of the normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub experiments: Vec<Experiment>,
    pub trials: Vec<Trial>,
    pub runs: Vec<Run>,
}
