//! Login / logout / whoami orchestration.

use crate::auth::{AuthError, Authenticator, Identity};
use crate::session::{token_prefix, SessionError, SessionTable, Token};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Stateless front for the authenticator and the session table.
#[derive(Clone)]
pub struct SessionService {
    authenticator: Authenticator,
    sessions: Arc<SessionTable>,
}

impl SessionService {
    pub fn new(authenticator: Authenticator, sessions: Arc<SessionTable>) -> Self {
        Self {
            authenticator,
            sessions,
        }
    }

    /// Verify credentials and open a session.
    #[instrument(skip(self, secret))]
    pub fn login(&self, username: &str, secret: &str) -> Result<Token, AuthError> {
        let identity = self.authenticator.authenticate(username, secret)?;
        let token = self.sessions.create(&identity)?;
        info!("Login succeeded, session {}", token_prefix(token.as_str()));
        Ok(token)
    }

    #[instrument(skip_all, fields(session = token_prefix(token)))]
    pub fn logout(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.revoke(token)?;
        info!("Logged out");
        Ok(())
    }

    pub fn whoami(&self, token: &str) -> Result<Identity, SessionError> {
        self.sessions.resolve(token)
    }

    /// Lifetime of newly issued sessions.
    pub fn ttl(&self) -> Duration {
        self.sessions.ttl()
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }
}
