//! Shared test infrastructure for integration tests
//!
//! Provides TestServer, which spawns the real tokengate binary on a free
//! port with a temporary TOML config, plus small request helpers.

#![allow(dead_code)]

use serde_json::Value;
use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Users every test server knows about.
pub const USERS: &[(&str, &str)] = &[("alice", "wonderland"), ("bob", "builder")];

/// Test server wrapper that spawns a real tokengate binary
pub struct TestServer {
    process: Child,
    port: u16,
    dir: TempDir,
}

impl TestServer {
    // ── Factory methods ──

    /// Start a server with default session settings
    pub async fn start() -> Self {
        Self::spawn_with_config("").await
    }

    /// Start a server whose sessions live `ttl_secs` seconds, swept every
    /// `sweep_secs` seconds
    pub async fn with_ttl(ttl_secs: u64, sweep_secs: u64) -> Self {
        let config = format!(
            "session_ttl_secs = {}\nsweep_interval_secs = {}\n",
            ttl_secs, sweep_secs
        );
        Self::spawn_with_config(&config).await
    }

    /// Start a server that writes its API documentation into the temp dir
    pub async fn with_api_doc() -> Self {
        Self::spawn_with_config("api_doc_path = \"API_DOC.md\"\n").await
    }

    // ── Shared spawn logic ──

    /// Allocate a port, write a TOML config, spawn the server and wait for
    /// readiness. All factory methods delegate here.
    async fn spawn_with_config(config_body: &str) -> Self {
        let port = free_port();
        let dir = TempDir::new().expect("Failed to create temp dir");

        let mut full_config = format!("listen_addr = \"127.0.0.1:{}\"\n{}", port, config_body);
        full_config.push_str("\n[users]\n");
        for (user, secret) in USERS {
            full_config.push_str(&format!("{} = \"{}\"\n", user, secret));
        }

        let config_path = dir.path().join("test.toml");
        std::fs::write(&config_path, &full_config).expect("Failed to write test config");

        let process = Command::new(env!("CARGO_BIN_EXE_tokengate"))
            .current_dir(dir.path())
            .env("TOKENGATE_CONFIG", &config_path)
            .env_remove("SESSION_TTL_SECONDS")
            .env_remove("SWEEP_INTERVAL_SECONDS")
            .env_remove("TOKENGATE_USERS")
            .env_remove("TOKENGATE_LISTEN_ADDR")
            .env_remove("TOKENGATE_METRICS")
            .env_remove("TOKENGATE_API_DOC")
            .env("RUST_LOG", "tokengate=warn")
            .spawn()
            .expect("Failed to start server");

        let mut server = Self { process, port, dir };
        server.wait_ready().await;
        server
    }

    // ── Instance methods ──

    async fn wait_ready(&mut self) {
        let addr = format!("127.0.0.1:{}", self.port);
        for _ in 0..150 {
            if std::net::TcpStream::connect(&addr).is_ok() {
                return;
            }

            if let Ok(Some(status)) = self.process.try_wait() {
                panic!("Server exited before becoming ready: {}", status);
            }

            sleep(Duration::from_millis(100)).await;
        }

        let _ = self.process.kill();
        panic!("Timed out waiting for server on {}", addr);
    }

    /// Get the HTTP endpoint URL
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint(), path)
    }

    /// Directory the server runs in
    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// POST /login, returning the raw response
    pub async fn login(&self, username: &str, secret: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url("/login"))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(format!("username={}&secret={}", username, secret))
            .send()
            .await
            .expect("login request failed")
    }

    /// POST /login and return the issued token, panicking on failure
    pub async fn login_token(&self, username: &str, secret: &str) -> String {
        let resp = self.login(username, secret).await;
        assert_eq!(resp.status().as_u16(), 200, "login should succeed");
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// GET /me with a bearer token
    pub async fn me(&self, token: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(self.url("/me"))
            .bearer_auth(token)
            .send()
            .await
            .expect("/me request failed")
    }

    /// POST /logout with a bearer token
    pub async fn logout(&self, token: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url("/logout"))
            .bearer_auth(token)
            .send()
            .await
            .expect("/logout request failed")
    }

    /// GET /health body
    pub async fn health(&self) -> Value {
        reqwest::get(self.url("/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

/// Ask the OS for an unused port.
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe port");
    listener.local_addr().unwrap().port()
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}
