//! Resolved server configuration.
//!
//! Values arrive from CLI flags and `LLMOBS_*` environment variables (parsed
//! by clap in `main.rs`, with `.env` loaded by dotenvy first) and end up here
//! as plain data that the router and store can consume.

use crate::store::DataPaths;
use std::path::Path;

pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:5173,http://127.0.0.1:5173,http://localhost:3000,http://localhost:3001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data: DataPaths,
    pub host: String,
    pub port: u16,
    /// Always starts with `/` and never ends with one.
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
    pub enable_cache: bool,
}

impl Config {
    /// Defaults with the three files read from `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Config {
            data: DataPaths::in_dir(data_dir),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            enable_cache: true,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve file names against the data directory. Absolute names win.
pub fn data_paths(
    data_dir: &Path,
    experiments_file: &Path,
    trials_file: &Path,
    runs_file: &Path,
) -> DataPaths {
    DataPaths {
        experiments: data_dir.join(experiments_file),
        trials: data_dir.join(trials_file),
        runs: data_dir.join(runs_file),
    }
}

/// `api/v1/` and `/api/v1` both become `/api/v1`; empty stays empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Comma-separated origin list; blanks dropped.
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix("/api/v1"), "/api/v1");
        assert_eq!(normalize_prefix("api/v1/"), "/api/v1");
        assert_eq!(normalize_prefix(" / "), "");
    }

    #[test]
    fn origins_split_and_trim() {
        assert_eq!(
            parse_origins("http://a, http://b ,,"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
        assert_eq!(parse_origins(DEFAULT_CORS_ORIGINS).len(), 4);
    }

    #[test]
    fn file_names_resolve_against_data_dir() {
        let paths = data_paths(
            Path::new("data"),
            Path::new("exp.csv"),
            Path::new("/abs/trials.csv"),
            Path::new("runs.csv"),
        );
        assert_eq!(paths.experiments, Path::new("data/exp.csv"));
        assert_eq!(paths.trials, Path::new("/abs/trials.csv"));
        assert_eq!(paths.runs, Path::new("data/runs.csv"));
    }

    #[test]
    fn defaults() {
        let cfg = Config::with_data_dir(Path::new("d"));
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8000");
        assert_eq!(cfg.api_prefix, "/api/v1");
        assert!(cfg.enable_cache);
        assert_eq!(cfg.data, DataPaths::in_dir(Path::new("d")));
    }
}
