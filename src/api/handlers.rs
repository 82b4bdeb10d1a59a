//! Session API request handlers

use super::errors::ApiError;
use super::extractors::BearerToken;
use crate::auth::{AuthError, Authenticator, Identity};
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::metrics::Metrics;
use crate::service::SessionService;
use crate::session::{token_prefix, SessionTable};
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Application state shared across handlers
pub struct AppState {
    pub service: SessionService,
    pub metrics: Option<Metrics>,
}

impl AppState {
    /// Wire the credential store, session table and service from `config`.
    pub fn from_config(config: &Config) -> Self {
        let store = CredentialStore::from_pairs(config.users.iter());
        let sessions = Arc::new(SessionTable::new(config.session_ttl()));
        let service = SessionService::new(Authenticator::new(Arc::new(store)), sessions);
        let metrics = config.metrics_enabled.then(Metrics::new);
        Self { service, metrics }
    }
}

/// Login form. Missing fields deserialize as empty and fail authentication.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "password")]
    pub secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_time: String,
    pub active_sessions: usize,
}

fn record_login_attempt(state: &AppState, result: &'static str) {
    if let Some(m) = &state.metrics {
        m.login_attempts_total.with_label_values(&[result]).inc();
    }
}

/// POST /login — verify credentials, issue a bearer token.
///
/// A body that is not a well-formed login form (wrong content type,
/// duplicated fields) is answered like a failed login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("Login form rejected: {}", rejection);
            record_login_attempt(&state, "invalid_credentials");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let result = state.service.login(&form.username, &form.secret);
    record_login_attempt(
        &state,
        match &result {
            Ok(_) => "success",
            Err(AuthError::InvalidCredentials) => "invalid_credentials",
            Err(AuthError::Session(_)) => "error",
        },
    );

    match result {
        Ok(token) => Ok(Json(LoginResponse {
            token: token.into_string(),
            token_type: "bearer".to_string(),
            expires_in: state.service.ttl().as_secs(),
        })),
        Err(e) => {
            warn!("Login failed for '{}': {}", form.username, e);
            Err(e.into())
        }
    }
}

/// POST /logout — revoke the presented token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service.logout(&token).map_err(|e| {
        debug!("Logout rejected for {}: {}", token_prefix(&token), e);
        ApiError::from(e)
    })?;

    if let Some(m) = &state.metrics {
        m.logouts_total.inc();
    }

    Ok(Json(MessageResponse {
        message: "Successfully logged out.".to_string(),
    }))
}

/// GET /me — identity behind the presented token.
pub async fn me(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> Result<Json<Identity>, ApiError> {
    let identity = state.service.whoami(&token).map_err(|e| {
        debug!("Token {} rejected: {}", token_prefix(&token), e);
        ApiError::from(e)
    })?;
    Ok(Json(identity))
}

/// GET /health — liveness plus session count.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_time: env!("TOKENGATE_BUILD_TIME").to_string(),
        active_sessions: state.service.sessions().len(),
    })
}

