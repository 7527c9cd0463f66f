//! # Dashboard — HTTP API Server
//!
//! Runs an Axum HTTP server exposing the experiment, trial, dashboard, metrics,
//! search, and admin endpoints over the current [`Snapshot`]. All API routes
//! are nested under the configured prefix (default `/api/v1`); `/`, `/healthz`,
//! and `/metrics` stay at the root.
//!
//! Handlers clone the snapshot `Arc` once per request and run the synchronous
//! query functions against it, so a concurrent reload never changes the data
//! under a request halfway through.
//!
//! [`Snapshot`]: crate::store::Snapshot

mod routes_admin;
mod routes_dashboard;
mod routes_experiments;
mod routes_health;
mod routes_search;
mod routes_trials;

use crate::analytics::MetricsCache;
use crate::config::Config;
use crate::prom_metrics;
use crate::store::Store;
use anyhow::{Context, Result};
use axum::extract::rejection::PathRejection;
use axum::extract::{OriginalUri, Path, Request};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};

pub const SERVICE_NAME: &str = "LLM Observability Platform";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct AppState {
    pub store: Store,
    pub cache: MetricsCache,
    pub config: Config,
    pub prom_metrics: prom_metrics::Metrics,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        let prom_metrics = prom_metrics::Metrics::new();
        let cache =
            MetricsCache::new(config.enable_cache).with_counters(prom_metrics.cache_requests.clone());
        prom_metrics.observe_snapshot(&store.snapshot());
        Arc::new(AppState {
            store,
            cache,
            config,
            prom_metrics,
            started_at: Utc::now(),
        })
    }
}

/// 404 body shared by every handler.
pub(super) fn not_found(message: &str, uri: &OriginalUri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": message, "path": uri.path()})),
    )
        .into_response()
}

pub(super) fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": message.into()})),
    )
        .into_response()
}

/// Unwrap a numeric `{id}` path segment, turning a parse failure into the
/// same JSON 400 body the query-parameter checks use.
pub(super) fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, Response> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => Err(bad_request(format!("invalid id: {}", rejection.body_text()))),
    }
}

async fn handler_not_found(uri: OriginalUri) -> Response {
    not_found("Not Found", &uri)
}

/// Middleware that records HTTP request duration into the Prometheus histogram,
/// generates (or propagates) a request ID for correlation, stamps the
/// processing time on the response, and wraps the request in a tracing span.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let mut response = next.run(req).instrument(span).await;

    let elapsed = start.elapsed().as_secs_f64();
    state
        .prom_metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(elapsed);

    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", v);
    }
    if let Ok(v) = HeaderValue::from_str(&format!("{elapsed:.6}")) {
        headers.insert("x-process-time", v);
    }
    response
}

/// Normalize URL path to collapse numeric IDs into placeholders, preventing
/// histogram label explosion.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        }))
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(routes_health::handler_health))
        .route("/status", get(routes_health::handler_status))
        .route(
            "/experiments",
            get(routes_experiments::handler_experiments_list),
        )
        .route(
            "/experiments/{id}",
            get(routes_experiments::handler_experiment_get),
        )
        .route(
            "/experiments/{id}/trials",
            get(routes_experiments::handler_experiment_trials),
        )
        .route(
            "/experiments/{id}/accuracy-curve",
            get(routes_experiments::handler_accuracy_curve),
        )
        .route("/trials/{id}", get(routes_trials::handler_trial_get))
        .route("/trials/{id}/runs", get(routes_trials::handler_trial_runs))
        .route("/trials/{id}/stats", get(routes_trials::handler_trial_stats))
        .route(
            "/dashboard/stats",
            get(routes_dashboard::handler_dashboard_stats),
        )
        .route(
            "/dashboard/cost-breakdown",
            get(routes_dashboard::handler_cost_breakdown),
        )
        .route(
            "/dashboard/daily-costs",
            get(routes_dashboard::handler_daily_costs),
        )
        .route(
            "/metrics/performance",
            get(routes_dashboard::handler_performance),
        )
        .route(
            "/metrics/anomalies",
            get(routes_dashboard::handler_anomalies),
        )
        .route("/metrics/trends", get(routes_dashboard::handler_trends))
        .route("/stats/summary", get(routes_dashboard::handler_summary))
        .route("/search", get(routes_search::handler_search))
        .route(
            "/search/suggestions",
            get(routes_search::handler_suggestions),
        )
        .route("/cache/clear", post(routes_admin::handler_cache_clear))
        .route("/admin/reload", post(routes_admin::handler_reload))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let root = Router::new()
        .route("/", get(routes_health::handler_root))
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/metrics", get(routes_health::handler_metrics));

    let prefix = state.config.api_prefix.as_str();
    let app = if prefix.is_empty() {
        root.merge(api_routes())
    } else {
        root.nest(prefix, api_routes())
    };

    app.fallback(handler_not_found)
        .layer(cors_layer(&state.config.cors_origins))
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

/// Load the data directory and serve until SIGINT/SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let store = Store::open(config.data.clone()).context("initial data load failed")?;
    let addr = config.bind_addr();
    let state = AppState::new(store, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "api server running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("api server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await.ok();
                info!("received SIGINT, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}
