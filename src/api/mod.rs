//! HTTP API: login, logout, whoami, health and metrics.

mod errors;
mod extractors;
pub mod handlers;

pub use errors::ApiError;
pub use extractors::{parse_bearer, BearerToken};

use crate::metrics::{http_metrics_middleware, metrics_handler};
use axum::routing::{get, post};
use axum::{middleware, Router};
use handlers::AppState;
use std::sync::Arc;

/// Build the API router.
///
/// Routes:
///   POST /login   - form credentials -> bearer token
///   POST /logout  - revoke the bearer token
///   GET  /me      - identity behind the bearer token
///   GET  /health  - liveness
///   GET  /metrics - Prometheus text format
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            http_metrics_middleware,
        ))
        .with_state(state)
}
