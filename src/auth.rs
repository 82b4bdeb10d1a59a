//! Username/secret authentication against the credential store.

use crate::credentials::CredentialStore;
use crate::session::SessionError;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Identity {
    pub username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Login failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user or wrong secret; deliberately not told apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Verifies presented credentials and produces an [`Identity`].
#[derive(Debug, Clone)]
pub struct Authenticator {
    store: Arc<CredentialStore>,
}

impl Authenticator {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    pub fn authenticate(&self, username: &str, secret: &str) -> Result<Identity, AuthError> {
        if self.store.verify(username, secret) {
            Ok(Identity::new(username))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
