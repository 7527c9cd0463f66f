//! CSV ingestion and normalization into typed rows.
//!
//! The on-disk files carry a few quirks: a pandas-style row-index column,
//! duplicated headers, unit-suffixed column names (`duration(s)`,
//! `latency(ms)`), legacy names (`experiment_name`, `is_del`), mixed-case
//! status strings, and two timestamp format families. `canonicalize` fixes the
//! shape of a table; the `*_from` functions then turn cells into typed rows.
//!
//! Malformed cells become `None` and are tallied in a [`ParseReport`]. Only a
//! structurally missing required column fails the load.

use super::types::{Experiment, Run, Trial, TrialStatus};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;

/// Experiments are written as `2024-03-01 14:30:00`.
pub const EXPERIMENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Trials and runs are written day-first, e.g. `01/03/2024 14:30`.
pub const DAY_FIRST_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Formats tried, in order, once a column falls back to permissive parsing.
const PERMISSIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const PERMISSIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Headers pandas writes for an exported row index.
const INDEX_HEADERS: &[&str] = &["", "index", "level_0"];

// ── Raw tables ──────────────────────────────────────────────────

/// A CSV file as headers plus string cells, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .context("failed to read CSV header row")?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("malformed CSV record at row {}", i + 1))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(RawTable { headers, rows })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("failed to parse {}", path.display()))
    }
}

// ── Entity schemas ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Experiment,
    Trial,
    Run,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Experiment => "experiments",
            EntityKind::Trial => "trials",
            EntityKind::Run => "runs",
        }
    }

    fn required_columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Experiment => &["id", "name", "project_id"],
            EntityKind::Trial => &["id", "experiment_id", "status"],
            EntityKind::Run => &["id", "trial_id"],
        }
    }

    /// `(alias, canonical)` header pairs.
    fn aliases(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            EntityKind::Experiment => &[("experiment_name", "name"), ("is_del", "is_deleted")],
            EntityKind::Trial => &[("duration(s)", "duration_seconds")],
            EntityKind::Run => &[("latency(ms)", "latency_ms"), ("cost", "costs")],
        }
    }

    pub fn timestamp_format(&self) -> &'static str {
        match self {
            EntityKind::Experiment => EXPERIMENT_TIMESTAMP_FORMAT,
            EntityKind::Trial | EntityKind::Run => DAY_FIRST_TIMESTAMP_FORMAT,
        }
    }
}

fn is_index_header(header: &str) -> bool {
    let h = header.trim().to_ascii_lowercase();
    INDEX_HEADERS.contains(&h.as_str()) || h.starts_with("unnamed:")
}

// ── Canonical tables ────────────────────────────────────────────

/// A table with its header set fixed up: no index column, no duplicate
/// names, aliases resolved, required columns present.
#[derive(Debug, Clone)]
pub struct CanonicalTable {
    kind: EntityKind,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CanonicalTable {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn cell(&self, row: usize, col: Option<usize>) -> &str {
        col.and_then(|c| self.rows[row].get(c))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Fix the header set of `raw` for the given entity.
pub fn canonicalize(raw: RawTable, kind: EntityKind) -> Result<CanonicalTable> {
    let aliases = kind.aliases();
    let present: HashSet<&str> = raw.headers.iter().map(String::as_str).collect();

    let mut keep: Vec<(usize, String)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for (i, header) in raw.headers.iter().enumerate() {
        if is_index_header(header) {
            continue;
        }
        let name = match aliases.iter().find(|(alias, _)| alias == header) {
            // The canonical column wins when both spellings exist.
            Some((_, canonical)) if present.contains(canonical) => continue,
            Some((_, canonical)) => canonical.to_string(),
            None => header.clone(),
        };
        if seen.insert(name.clone()) {
            keep.push((i, name));
        }
    }

    for required in kind.required_columns() {
        if !seen.contains(*required) {
            bail!(
                "{} table is missing required column `{}` (found: {})",
                kind.label(),
                required,
                raw.headers.join(", ")
            );
        }
    }

    let rows = raw
        .rows
        .into_iter()
        .map(|row| {
            keep.iter()
                .map(|(i, _)| row.get(*i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(CanonicalTable {
        kind,
        columns: keep.into_iter().map(|(_, name)| name).collect(),
        rows,
    })
}

// ── Parse report ────────────────────────────────────────────────

/// Per-table tally of what the normalizer had to coerce or drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseReport {
    pub table: &'static str,
    pub rows: usize,
    pub skipped_rows: usize,
    /// Non-empty cells that failed to parse, by column.
    pub malformed_cells: BTreeMap<String, usize>,
    pub timestamp_fallback: bool,
}

impl ParseReport {
    fn new(kind: EntityKind) -> Self {
        ParseReport {
            table: kind.label(),
            ..Default::default()
        }
    }

    fn malformed(&mut self, column: &str) {
        *self.malformed_cells.entry(column.to_string()).or_insert(0) += 1;
    }

    pub fn total_malformed(&self) -> usize {
        self.malformed_cells.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped_rows == 0 && self.malformed_cells.is_empty()
    }
}

// ── Cell parsers ────────────────────────────────────────────────

fn is_null(cell: &str) -> bool {
    let c = cell.trim();
    c.is_empty() || c.eq_ignore_ascii_case("nan") || c.eq_ignore_ascii_case("null") || c == "NaT"
}

fn parse_f64(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integers may have been written through a float column (`1234.0`).
fn parse_i64(cell: &str) -> Option<i64> {
    let c = cell.trim();
    c.parse::<i64>().ok().or_else(|| {
        parse_f64(c)
            .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "1.0" => Some(true),
        "false" | "f" | "0" | "no" | "n" | "0.0" => Some(false),
        _ => None,
    }
}

/// Read an optional cell, tallying non-empty values that fail `parse`.
fn optional<T>(
    report: &mut ParseReport,
    column: &str,
    cell: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    if is_null(cell) {
        return None;
    }
    let value = parse(cell);
    if value.is_none() {
        report.malformed(column);
    }
    value
}

fn non_negative_i64(cell: &str) -> Option<u64> {
    parse_i64(cell).and_then(|v| u64::try_from(v).ok())
}

fn non_negative_f64(cell: &str) -> Option<f64> {
    parse_f64(cell).filter(|v| *v >= 0.0)
}

// ── Timestamps ──────────────────────────────────────────────────

fn parse_strict(value: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), format).ok()
}

/// Best-effort timestamp parse across every format family the data uses.
pub fn parse_permissive(value: &str) -> Option<NaiveDateTime> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.naive_utc());
    }
    PERMISSIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok())
        .or_else(|| {
            PERMISSIVE_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a timestamp column with `strict`, falling back to [`parse_permissive`]
/// for the whole column when more than half of the non-null values fail.
///
/// Returns the parsed values and whether the fallback was used.
pub fn parse_timestamp_column(values: &[&str], strict: &str) -> (Vec<Option<NaiveDateTime>>, bool) {
    let strict_parsed: Vec<Option<NaiveDateTime>> = values
        .iter()
        .map(|v| if is_null(v) { None } else { parse_strict(v, strict) })
        .collect();
    let non_null = values.iter().filter(|v| !is_null(v)).count();
    let failed = values
        .iter()
        .zip(&strict_parsed)
        .filter(|(v, parsed)| !is_null(v) && parsed.is_none())
        .count();

    if non_null > 0 && failed * 2 > non_null {
        let permissive = values
            .iter()
            .map(|v| if is_null(v) { None } else { parse_permissive(v) })
            .collect();
        (permissive, true)
    } else {
        (strict_parsed, false)
    }
}

fn timestamps(table: &CanonicalTable, report: &mut ParseReport) -> Vec<Option<NaiveDateTime>> {
    let Some(col) = table.column("created_at") else {
        return vec![None; table.len()];
    };
    let raw: Vec<&str> = (0..table.len()).map(|r| table.cell(r, Some(col))).collect();
    let (parsed, fallback) = parse_timestamp_column(&raw, table.kind().timestamp_format());
    report.timestamp_fallback = fallback;
    for (cell, value) in raw.iter().zip(&parsed) {
        if !is_null(cell) && value.is_none() {
            report.malformed("created_at");
        }
    }
    parsed
}

/// Parse a key column cell; rows without a usable key are dropped.
fn key(table: &CanonicalTable, row: usize, col: usize) -> Option<i64> {
    let cell = table.cell(row, Some(col));
    if is_null(cell) {
        None
    } else {
        parse_i64(cell)
    }
}

// ── Typed extraction ────────────────────────────────────────────

pub fn experiments_from(table: &CanonicalTable) -> (Vec<Experiment>, ParseReport) {
    let mut report = ParseReport::new(EntityKind::Experiment);
    let id_col = table.column("id");
    let name_col = table.column("name");
    let project_col = table.column("project_id");
    let deleted_col = table.column("is_deleted");
    let created = timestamps(table, &mut report);

    let mut out = Vec::with_capacity(table.len());
    for (row, created_at) in created.into_iter().enumerate() {
        let Some(id) = id_col.and_then(|c| key(table, row, c)) else {
            report.skipped_rows += 1;
            continue;
        };
        let deleted_cell = table.cell(row, deleted_col);
        let is_deleted = optional(&mut report, "is_deleted", deleted_cell, parse_bool).unwrap_or(false);
        out.push(Experiment {
            id,
            name: table.cell(row, name_col).to_string(),
            project_id: table.cell(row, project_col).to_string(),
            created_at,
            is_deleted,
        });
    }
    report.rows = out.len();
    (out, report)
}

pub fn trials_from(table: &CanonicalTable) -> (Vec<Trial>, ParseReport) {
    let mut report = ParseReport::new(EntityKind::Trial);
    let id_col = table.column("id");
    let exp_col = table.column("experiment_id");
    let status_col = table.column("status");
    let accuracy_col = table.column("accuracy");
    let duration_col = table.column("duration_seconds");
    let created = timestamps(table, &mut report);

    let mut out = Vec::with_capacity(table.len());
    for (row, created_at) in created.into_iter().enumerate() {
        let (Some(id), Some(experiment_id)) = (
            id_col.and_then(|c| key(table, row, c)),
            exp_col.and_then(|c| key(table, row, c)),
        ) else {
            report.skipped_rows += 1;
            continue;
        };
        let status = optional(&mut report, "status", table.cell(row, status_col), |s| {
            s.parse::<TrialStatus>().ok()
        });
        let accuracy = optional(&mut report, "accuracy", table.cell(row, accuracy_col), parse_f64);
        let duration_seconds = optional(
            &mut report,
            "duration_seconds",
            table.cell(row, duration_col),
            parse_i64,
        );
        out.push(Trial {
            id,
            experiment_id,
            status,
            created_at,
            accuracy,
            duration_seconds,
        });
    }
    report.rows = out.len();
    (out, report)
}

pub fn runs_from(table: &CanonicalTable) -> (Vec<Run>, ParseReport) {
    let mut report = ParseReport::new(EntityKind::Run);
    let id_col = table.column("id");
    let trial_col = table.column("trial_id");
    let tokens_col = table.column("tokens");
    let costs_col = table.column("costs");
    let latency_col = table.column("latency_ms");
    let created = timestamps(table, &mut report);

    let mut out = Vec::with_capacity(table.len());
    for (row, created_at) in created.into_iter().enumerate() {
        let (Some(id), Some(trial_id)) = (
            id_col.and_then(|c| key(table, row, c)),
            trial_col.and_then(|c| key(table, row, c)),
        ) else {
            report.skipped_rows += 1;
            continue;
        };
        out.push(Run {
            id,
            trial_id,
            tokens: optional(&mut report, "tokens", table.cell(row, tokens_col), non_negative_i64),
            costs: optional(&mut report, "costs", table.cell(row, costs_col), non_negative_f64),
            latency_ms: optional(
                &mut report,
                "latency_ms",
                table.cell(row, latency_col),
                non_negative_i64,
            ),
            created_at,
        });
    }
    report.rows = out.len();
    (out, report)
}

pub fn normalize_experiments(raw: RawTable) -> Result<(Vec<Experiment>, ParseReport)> {
    Ok(experiments_from(&canonicalize(raw, EntityKind::Experiment)?))
}

pub fn normalize_trials(raw: RawTable) -> Result<(Vec<Trial>, ParseReport)> {
    Ok(trials_from(&canonicalize(raw, EntityKind::Trial)?))
}

pub fn normalize_runs(raw: RawTable) -> Result<(Vec<Run>, ParseReport)> {
    Ok(runs_from(&canonicalize(raw, EntityKind::Run)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(csv: &str) -> RawTable {
        RawTable::from_reader(csv.as_bytes()).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn canonicalize_drops_index_column_and_duplicates() {
        let table = canonicalize(
            raw(",id,experiment_name,project_id,id\n0,1,exp-1,p,9\n"),
            EntityKind::Experiment,
        )
        .unwrap();
        assert_eq!(table.columns(), &["id", "name", "project_id"]);
        let (rows, _) = experiments_from(&table);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].name, "exp-1");
    }

    #[test]
    fn canonicalize_drops_unnamed_pandas_index() {
        let table = canonicalize(
            raw("Unnamed: 0,id,trial_id\n0,1,1\n"),
            EntityKind::Run,
        )
        .unwrap();
        assert_eq!(table.columns(), &["id", "trial_id"]);
    }

    #[test]
    fn canonical_column_wins_over_alias() {
        let table = canonicalize(
            raw("id,experiment_id,status,duration(s),duration_seconds\n1,1,finished,5,7\n"),
            EntityKind::Trial,
        )
        .unwrap();
        let (rows, _) = trials_from(&table);
        assert_eq!(rows[0].duration_seconds, Some(7));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let err = canonicalize(raw("name,project_id\nx,p\n"), EntityKind::Experiment).unwrap_err();
        assert!(err.to_string().contains("`id`"));

        let err = canonicalize(raw("id,tokens\n1,5\n"), EntityKind::Run).unwrap_err();
        assert!(err.to_string().contains("trial_id"));
    }

    #[test]
    fn experiments_parse_legacy_headers() {
        let (rows, report) = normalize_experiments(raw(
            "id,experiment_name,project_id,created_at,is_del\n\
             1,exp-1,project_a,2024-03-01 14:30:00,False\n\
             2,exp-2,project_b,2024-03-02 09:00:00,True\n",
        ))
        .unwrap();
        assert!(report.is_clean());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].created_at, Some(at(2024, 3, 1, 14, 30, 0)));
        assert!(!rows[0].is_deleted);
        assert!(rows[1].is_deleted);
    }

    #[test]
    fn trials_parse_day_first_and_lowercase_status() {
        let (rows, report) = normalize_trials(raw(
            "id,experiment_id,status,created_at,accuracy,duration(s)\n\
             1,1,FINISHED,05/03/2024 10:15,0.82,1200.0\n\
             2,1,Pending,06/03/2024 11:00,,\n",
        ))
        .unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(rows[0].status, Some(TrialStatus::Finished));
        assert_eq!(rows[0].created_at, Some(at(2024, 3, 5, 10, 15, 0)));
        assert_eq!(rows[0].duration_seconds, Some(1200));
        assert_eq!(rows[1].status, Some(TrialStatus::Pending));
        assert_eq!(rows[1].accuracy, None);
    }

    #[test]
    fn malformed_cells_become_null_and_are_counted() {
        let (rows, report) = normalize_runs(raw(
            "id,trial_id,tokens,costs,latency(ms),created_at\n\
             1,1,abc,0.5,-3,01/01/2024 00:00\n\
             2,1,100,oops,20,01/01/2024 01:00\n\
             x,1,100,0.5,20,01/01/2024 02:00\n",
        ))
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(rows[0].tokens, None);
        assert_eq!(rows[0].latency_ms, None);
        assert_eq!(rows[1].costs, None);
        assert_eq!(report.malformed_cells["tokens"], 1);
        assert_eq!(report.malformed_cells["costs"], 1);
        assert_eq!(report.malformed_cells["latency_ms"], 1);
    }

    #[test]
    fn unknown_status_is_null() {
        let (rows, report) = normalize_trials(raw(
            "id,experiment_id,status\n1,1,exploded\n2,1,\n",
        ))
        .unwrap();
        assert_eq!(rows[0].status, None);
        assert_eq!(rows[1].status, None);
        assert_eq!(report.malformed_cells["status"], 1);
    }

    #[test]
    fn strict_format_kept_when_most_values_parse() {
        let values = ["01/02/2024 10:00", "02/02/2024 10:00", "2024-02-03 10:00:00"];
        let (parsed, fallback) = parse_timestamp_column(&values, DAY_FIRST_TIMESTAMP_FORMAT);
        assert!(!fallback);
        assert_eq!(parsed[0], Some(at(2024, 2, 1, 10, 0, 0)));
        assert_eq!(parsed[2], None);
    }

    #[test]
    fn permissive_fallback_when_majority_fails() {
        let values = ["2024-02-01T10:00:00", "2024-02-02 10:00:00", "02/02/2024 11:30", ""];
        let (parsed, fallback) = parse_timestamp_column(&values, DAY_FIRST_TIMESTAMP_FORMAT);
        assert!(fallback);
        assert_eq!(parsed[0], Some(at(2024, 2, 1, 10, 0, 0)));
        assert_eq!(parsed[1], Some(at(2024, 2, 2, 10, 0, 0)));
        assert_eq!(parsed[2], Some(at(2024, 2, 2, 11, 30, 0)));
        assert_eq!(parsed[3], None);
    }

    #[test]
    fn exactly_half_failing_stays_strict() {
        let values = ["01/02/2024 10:00", "2024-02-02 10:00:00"];
        let (_, fallback) = parse_timestamp_column(&values, DAY_FIRST_TIMESTAMP_FORMAT);
        assert!(!fallback);
    }

    #[test]
    fn permissive_handles_rfc3339_and_dates() {
        assert_eq!(
            parse_permissive("2024-05-01T12:00:00Z"),
            Some(at(2024, 5, 1, 12, 0, 0))
        );
        assert_eq!(parse_permissive("2024-05-01"), Some(at(2024, 5, 1, 0, 0, 0)));
        assert_eq!(parse_permissive("not a date"), None);
    }

    #[test]
    fn short_rows_are_padded() {
        let (rows, _) = normalize_runs(raw("id,trial_id,tokens,costs\n1,2\n")).unwrap();
        assert_eq!(rows[0].trial_id, 2);
        assert_eq!(rows[0].tokens, None);
        assert_eq!(rows[0].costs, None);
    }
}
