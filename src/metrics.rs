//! Prometheus metrics for tokengate.
//!
//! All metric types use atomics internally (no locks on the hot path).
//! The `Metrics` struct is `Clone`-cheap (Arc-based registry + Arc-based collectors).

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder, TEXT_FORMAT,
};
use std::sync::Arc;
use std::time::Instant;

use crate::api::handlers::AppState;

/// All Prometheus metrics for tokengate.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // -- Process --
    pub process_start_time_seconds: Gauge,

    // -- HTTP Requests --
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // -- Sessions --
    pub login_attempts_total: IntCounterVec,
    pub logouts_total: IntCounter,
    pub sessions_active: IntGauge,
    pub sessions_swept_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        // -- Process --
        let process_start_time_seconds =
            Gauge::new("process_start_time_seconds", "Start time of the process").unwrap();
        registry
            .register(Box::new(process_start_time_seconds.clone()))
            .unwrap();
        process_start_time_seconds.set(chrono::Utc::now().timestamp() as f64);

        // Register standard process metrics (RSS, CPU, open FDs on Linux)
        #[cfg(target_os = "linux")]
        {
            let pc = prometheus::process_collector::ProcessCollector::for_self();
            let _ = registry.register(Box::new(pc));
        }

        // -- HTTP Requests --
        let http_requests_total = IntCounterVec::new(
            Opts::new(
                "tokengate_http_requests_total",
                "Total HTTP requests by method, status, and operation",
            ),
            &["method", "status", "operation"],
        )
        .unwrap();
        registry
            .register(Box::new(http_requests_total.clone()))
            .unwrap();

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tokengate_http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "operation"],
        )
        .unwrap();
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .unwrap();

        // -- Sessions --
        let login_attempts_total = IntCounterVec::new(
            Opts::new("tokengate_login_attempts_total", "Login attempts by result"),
            &["result"],
        )
        .unwrap();
        registry
            .register(Box::new(login_attempts_total.clone()))
            .unwrap();

        let logouts_total =
            IntCounter::new("tokengate_logouts_total", "Successful logouts").unwrap();
        registry.register(Box::new(logouts_total.clone())).unwrap();

        let sessions_active = IntGauge::new(
            "tokengate_sessions_active",
            "Sessions in the table, expired-but-unswept included (updated on scrape)",
        )
        .unwrap();
        registry
            .register(Box::new(sessions_active.clone()))
            .unwrap();

        let sessions_swept_total = IntCounter::new(
            "tokengate_sessions_swept_total",
            "Expired sessions removed by the background sweeper",
        )
        .unwrap();
        registry
            .register(Box::new(sessions_swept_total.clone()))
            .unwrap();

        Metrics {
            registry,
            process_start_time_seconds,
            http_requests_total,
            http_request_duration_seconds,
            login_attempts_total,
            logouts_total,
            sessions_active,
            sessions_swept_total,
        }
    }
}

/// Classify a request into a bounded operation label.
pub fn classify_operation(method: &str, path: &str) -> &'static str {
    match (method, path) {
        ("POST", "/login") => "login",
        ("POST", "/logout") => "logout",
        ("GET", "/me") => "whoami",
        (_, "/health") => "health",
        (_, "/metrics") => "metrics",
        _ => "unknown",
    }
}

/// Axum middleware that records HTTP request metrics.
pub async fn http_metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let metrics = match &state.metrics {
        Some(m) => m,
        None => return next.run(request).await,
    };

    let method = request.method().to_string();
    let operation = classify_operation(&method, request.uri().path());

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    let status = response.status().as_u16().to_string();

    metrics
        .http_requests_total
        .with_label_values(&[&method, &status, operation])
        .inc();
    metrics
        .http_request_duration_seconds
        .with_label_values(&[&method, operation])
        .observe(duration);

    response
}

/// Handler for GET /metrics — returns Prometheus text format.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metrics = match &state.metrics {
        Some(m) => m,
        None => {
            return (StatusCode::NOT_FOUND, "Metrics not enabled").into_response();
        }
    };

    metrics
        .sessions_active
        .set(state.service.sessions().len() as i64);

    let encoder = TextEncoder::new();
    let metric_families = metrics.registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (StatusCode::OK, [("content-type", TEXT_FORMAT)], buffer).into_response()
}
