//! # llmobs — Read-Only LLM Experiment Analytics
//!
//! Loads experiment, trial, and run metadata from three CSV files into an
//! immutable in-memory snapshot and serves filtered listings, rollups, cost
//! views, and trend/anomaly analytics over a REST API.
//!
//! ## Layers
//!
//! - [`store`] — CSV normalization, rollups, snapshot with atomic swap
//! - [`query`] — listing, lookup, cost, and search operations over a snapshot
//! - [`analytics`] — dashboard KPIs, percentiles, anomalies, trends, memo cache
//! - [`dashboard`] — Axum server, routes, and middleware
//! - [`prom_metrics`] — Prometheus registry
//! - [`config`] — resolved server configuration
//! - [`generate`] — seeded sample-data writer

pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod generate;
pub mod prom_metrics;
pub mod query;
pub mod store;
