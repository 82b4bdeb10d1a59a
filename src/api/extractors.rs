//! Custom Axum extractors for the session API

use super::errors::ApiError;
use crate::session::token_prefix;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

/// Bearer token taken from the `Authorization` header.
///
/// Rejects with [`ApiError::InvalidToken`] when the header is missing, not
/// valid UTF-8, uses another scheme, or carries an empty token, so handlers
/// receive the token as a plain value.
///
/// # Example
/// ```ignore
/// async fn me(
///     State(state): State<Arc<AppState>>,
///     BearerToken(token): BearerToken,
/// ) -> Result<Json<Identity>, ApiError> {
///     Ok(Json(state.service.whoami(&token)?))
/// }
/// ```
#[derive(Clone)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BearerToken({}…)", token_prefix(&self.0))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_bearer(&parts.headers)
            .map(BearerToken)
            .ok_or(ApiError::InvalidToken)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
/// The scheme name is case-insensitive.
pub fn parse_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer(&headers("Bearer abc123")), Some("abc123".into()));
        assert_eq!(parse_bearer(&headers("bearer  abc123 ")), Some("abc123".into()));
        assert_eq!(parse_bearer(&headers("BEARER abc123")), Some("abc123".into()));
    }

    #[test]
    fn test_parse_bearer_rejects() {
        assert_eq!(parse_bearer(&HeaderMap::new()), None);
        assert_eq!(parse_bearer(&headers("Basic YWxpY2U6d29uZGVybGFuZA==")), None);
        assert_eq!(parse_bearer(&headers("Bearer")), None);
        assert_eq!(parse_bearer(&headers("Bearer    ")), None);
        assert_eq!(parse_bearer(&headers("abc123")), None);
    }

    #[test]
    fn test_parse_bearer_non_utf8() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );
        assert_eq!(parse_bearer(&headers), None);
    }
}
