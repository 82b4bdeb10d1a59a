//! Immutable username -> secret table used by the authenticator.
//!
//! Secrets are kept as SHA-256 digests and compared in constant time, so
//! the comparison cost does not depend on where two secrets first differ or
//! on their lengths. Unknown usernames are compared against a fixed dummy
//! digest, making "no such user" and "wrong secret" take the same path.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use subtle::ConstantTimeEq;

type SecretDigest = [u8; 32];

fn digest(secret: &str) -> SecretDigest {
    Sha256::digest(secret.as_bytes()).into()
}

/// Thread-safe (immutable) credential store.
pub struct CredentialStore {
    secrets: HashMap<String, SecretDigest>,
    dummy: SecretDigest,
}

impl CredentialStore {
    /// Build a store from `(username, secret)` pairs. Later duplicates win.
    pub fn from_pairs<I, U, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (U, S)>,
        U: Into<String>,
        S: AsRef<str>,
    {
        let secrets = pairs
            .into_iter()
            .map(|(user, secret)| (user.into(), digest(secret.as_ref())))
            .collect();

        Self {
            secrets,
            dummy: digest("tokengate-unknown-user"),
        }
    }

    /// Check a username/secret pair.
    ///
    /// Returns `false` for empty inputs, unknown users and wrong secrets
    /// alike.
    pub fn verify(&self, username: &str, secret: &str) -> bool {
        if username.is_empty() || secret.is_empty() {
            return false;
        }

        let presented = digest(secret);
        let (expected, known) = match self.secrets.get(username) {
            Some(d) => (d, true),
            None => (&self.dummy, false),
        };

        let matches: bool = presented.as_slice().ct_eq(expected.as_slice()).into();
        matches && known
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, username: &str) -> bool {
        self.secrets.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut users: Vec<&str> = self.secrets.keys().map(String::as_str).collect();
        users.sort_unstable();
        f.debug_struct("CredentialStore")
            .field("users", &users)
            .finish_non_exhaustive()
    }
}
