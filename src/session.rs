//! In-memory session table for bearer-token authentication.
//!
//! Every operation takes the table lock for a single short critical section
//! (the sweep takes several, one per batch), so a revoke racing a resolve is
//! observed either entirely before or entirely after.

use crate::auth::Identity;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use rand::Rng;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Default session TTL: 1 hour.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Random bytes per token (256 bits, hex-encoded to 64 chars).
const TOKEN_BYTES: usize = 32;

/// Draws before a collision is treated as fatal.
const MAX_TOKEN_ATTEMPTS: usize = 8;

/// Upper bound on removals per write-lock section during a sweep.
const SWEEP_BATCH: usize = 256;

/// Session table errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("session expired")]
    Expired,

    /// The token source kept returning tokens already in use.
    #[error("could not allocate a unique session token")]
    TokenCollision,
}

/// Opaque bearer token handed to clients.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({}…)", token_prefix(&self.0))
    }
}

/// First 8 characters of a token, safe to log.
pub fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

/// Server-side state behind a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of fresh token strings.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Hex tokens from the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenGenerator for RandomTokens {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.fill(&mut bytes);
        hex::encode(bytes)
    }
}

/// Thread-safe in-memory session table.
pub struct SessionTable {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    ttl: Duration,
    ttl_delta: TimeDelta,
    clock: Arc<dyn Clock>,
    tokens: Box<dyn TokenGenerator>,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionTable {
    pub fn new(ttl: Duration) -> Self {
        Self::with_parts(ttl, Arc::new(SystemClock), Box::new(RandomTokens))
    }

    /// Build a table with an explicit clock and token source.
    pub fn with_parts(
        ttl: Duration,
        clock: Arc<dyn Clock>,
        tokens: Box<dyn TokenGenerator>,
    ) -> Self {
        // Out-of-range TTLs saturate; expiry is clamped again in `create`.
        let ttl_delta = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            ttl_delta,
            clock,
            tokens,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open a session for `identity` and return its token.
    ///
    /// A drawn token that is already present is never overwritten; the table
    /// re-draws and gives up with [`SessionError::TokenCollision`] after
    /// `MAX_TOKEN_ATTEMPTS` draws.
    pub fn create(&self, identity: &Identity) -> Result<Token, SessionError> {
        let now = self.clock.now();
        let record = SessionRecord {
            username: identity.username.clone(),
            created_at: now,
            expires_at: now
                .checked_add_signed(self.ttl_delta)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let candidate = self.tokens.generate();
            let mut sessions = self.sessions.write();
            match sessions.entry(candidate) {
                Entry::Occupied(_) => {
                    warn!(attempt, "Session token collision, drawing a new token");
                }
                Entry::Vacant(slot) => {
                    let token = Token(slot.key().clone());
                    slot.insert(record);
                    debug!(
                        "Session {} created for {}",
                        token_prefix(token.as_str()),
                        identity.username
                    );
                    return Ok(token);
                }
            }
        }

        error!(
            "Token source produced {} colliding tokens in a row",
            MAX_TOKEN_ATTEMPTS
        );
        Err(SessionError::TokenCollision)
    }

    /// Look up the identity behind `token`.
    ///
    /// An expired record is removed before `Expired` is returned, so the next
    /// lookup of the same token yields `NotFound`.
    pub fn resolve(&self, token: &str) -> Result<Identity, SessionError> {
        let now = self.clock.now();

        {
            let sessions = self.sessions.read();
            match sessions.get(token) {
                None => return Err(SessionError::NotFound),
                Some(record) if !record.is_expired_at(now) => {
                    return Ok(Identity::new(record.username.clone()));
                }
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write();
        if sessions
            .get(token)
            .is_some_and(|record| record.is_expired_at(now))
        {
            sessions.remove(token);
            debug!("Session {} expired on lookup", token_prefix(token));
        }
        Err(SessionError::Expired)
    }

    /// Remove a session (logout).
    pub fn revoke(&self, token: &str) -> Result<(), SessionError> {
        match self.sessions.write().remove(token) {
            Some(record) => {
                debug!(
                    "Session {} revoked for {}",
                    token_prefix(token),
                    record.username
                );
                Ok(())
            }
            None => Err(SessionError::NotFound),
        }
    }

    /// Remove every session that expired before `now`. Returns how many were
    /// removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, record)| record.is_expired_at(now))
            .map(|(token, _)| token.clone())
            .collect();

        let mut removed = 0;
        for batch in expired.chunks(SWEEP_BATCH) {
            let mut sessions = self.sessions.write();
            for token in batch {
                if sessions
                    .get(token)
                    .is_some_and(|record| record.is_expired_at(now))
                {
                    sessions.remove(token);
                    removed += 1;
                }
            }
        }
        removed
    }

    /// [`sweep`](Self::sweep) at the table clock's current time.
    pub fn sweep_expired(&self) -> usize {
        self.sweep(self.clock.now())
    }

    /// Snapshot of the record behind `token`, expired or not.
    #[cfg(test)]
    pub(crate) fn get(&self, token: &str) -> Option<SessionRecord> {
        self.sessions.read().get(token).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
