//! API error types and JSON error responses

use crate::auth::AuthError;
use crate::session::SessionError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP clients.
///
/// Token failures collapse into one variant so a client cannot tell an
/// expired token from one that was never issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidCredentials | ApiError::InvalidToken => "unauthorized",
            ApiError::Internal => "internal_error",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound | SessionError::Expired => ApiError::InvalidToken,
            SessionError::TokenCollision => ApiError::Internal,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Session(e) => e.into(),
        }
    }
}
