//! Configuration for the tokengate server

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Session lifetime in seconds, counted from login
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Seconds between background sweeps of expired sessions
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Log level filter string. Overridden by RUST_LOG.
    /// Default: "tokengate=debug,tower_http=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Expose Prometheus metrics on /metrics
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    /// Where to write the Markdown API documentation at startup (skipped when unset)
    #[serde(default)]
    pub api_doc_path: Option<PathBuf>,

    /// Registered users: username -> secret. Loaded once; immutable at runtime.
    #[serde(default = "default_users")]
    pub users: BTreeMap<String, String>,
}

// Default value functions for serde
fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "tokengate=debug,tower_http=debug".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_users() -> BTreeMap<String, String> {
    BTreeMap::from([(DEMO_USER.to_string(), DEMO_SECRET.to_string())])
}

/// Built-in demo account, used when no users are configured.
pub const DEMO_USER: &str = "alice";
pub const DEMO_SECRET: &str = "wonderland";

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            session_ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            log_level: default_log_level(),
            metrics_enabled: default_metrics_enabled(),
            api_doc_path: None,
            users: default_users(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment overrides. `lookup` stands in for `std::env::var`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("TOKENGATE_LISTEN_ADDR") {
            match addr.parse() {
                Ok(parsed) => self.listen_addr = parsed,
                Err(_) => warn!("Ignoring invalid TOKENGATE_LISTEN_ADDR: {}", addr),
            }
        }

        if let Some(ttl) = lookup("SESSION_TTL_SECONDS") {
            match ttl.parse() {
                Ok(parsed) => self.session_ttl_secs = parsed,
                Err(_) => warn!("Ignoring invalid SESSION_TTL_SECONDS: {}", ttl),
            }
        }

        if let Some(interval) = lookup("SWEEP_INTERVAL_SECONDS") {
            match interval.parse() {
                Ok(parsed) => self.sweep_interval_secs = parsed,
                Err(_) => warn!("Ignoring invalid SWEEP_INTERVAL_SECONDS: {}", interval),
            }
        }

        if let Some(level) = lookup("TOKENGATE_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(flag) = lookup("TOKENGATE_METRICS") {
            self.metrics_enabled = flag == "true" || flag == "1";
        }

        if let Some(path) = lookup("TOKENGATE_API_DOC") {
            self.api_doc_path = Some(PathBuf::from(path));
        }

        if let Some(users) = lookup("TOKENGATE_USERS") {
            match parse_users(&users) {
                Some(parsed) => self.users = parsed,
                None => warn!("Ignoring malformed TOKENGATE_USERS (expected user:secret,...)"),
            }
        }
    }

    /// Load configuration from file if it exists, otherwise defaults; then
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if let Ok(path) = std::env::var("TOKENGATE_CONFIG") {
            Self::from_file(&path)?
        } else {
            ["tokengate.toml", "/etc/tokengate/config.toml"]
                .iter()
                .find(|path| std::path::Path::new(path).exists())
                .map(|path| Self::from_file(path))
                .transpose()?
                .unwrap_or_default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "session_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.users.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one user must be configured".to_string(),
            ));
        }
        if let Some((user, _)) = self
            .users
            .iter()
            .find(|(user, secret)| user.is_empty() || secret.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "user '{}' has an empty username or secret",
                user
            )));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// True when the only configured account is the built-in demo user.
    pub fn uses_demo_credentials(&self) -> bool {
        self.users.len() == 1
            && self.users.get(DEMO_USER).map(String::as_str) == Some(DEMO_SECRET)
    }
}

/// Parse `user:secret,user2:secret2`. Secrets may contain ':'.
fn parse_users(raw: &str) -> Option<BTreeMap<String, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (user, secret) = entry.split_once(':')?;
            Some((user.trim().to_string(), secret.to_string()))
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
