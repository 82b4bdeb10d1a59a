//! End-to-end session flow against the real binary
//!
//! Uses reqwest to drive login, whoami and logout over HTTP and checks
//! status codes, bodies and headers.

mod common;

use common::TestServer;
use serde_json::Value;
use std::time::Duration;

#[tokio::test]
async fn test_alice_login_whoami_logout() {
    let server = TestServer::start().await;

    let resp = server.login("alice", "wonderland").await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["token_type"], "bearer");
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    let resp = server.me(&token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"username": "alice"}));

    let resp = server.logout(&token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Successfully logged out.");

    let resp = server.me(&token).await;
    assert_eq!(resp.status().as_u16(), 401);

    let resp = server.login("alice", "wrong").await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn test_unauthorized_responses_do_not_leak_reason() {
    let server = TestServer::start().await;

    let wrong_secret: Value = server.login("alice", "nope").await.json().await.unwrap();
    let unknown_user: Value = server
        .login("mallory", "wonderland")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(wrong_secret, unknown_user);

    let token = server.login_token("alice", "wonderland").await;
    server.logout(&token).await;
    let revoked = server.me(&token).await;
    assert_eq!(revoked.status().as_u16(), 401);
    assert_eq!(
        revoked
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
    let revoked: Value = revoked.json().await.unwrap();
    let never_issued: Value = server.me("0123456789abcdef").await.json().await.unwrap();
    assert_eq!(revoked, never_issued);
}

#[tokio::test]
async fn test_sessions_are_per_login() {
    let server = TestServer::start().await;

    let first = server.login_token("alice", "wonderland").await;
    let second = server.login_token("alice", "wonderland").await;
    let bob = server.login_token("bob", "builder").await;
    assert_ne!(first, second);

    server.logout(&first).await;
    assert_eq!(server.me(&first).await.status().as_u16(), 401);
    assert_eq!(server.me(&second).await.status().as_u16(), 200);

    let body: Value = server.me(&bob).await.json().await.unwrap();
    assert_eq!(body["username"], "bob");
    assert_eq!(server.health().await["active_sessions"], 2);
}

#[tokio::test]
async fn test_session_expires() {
    let server = TestServer::with_ttl(1, 60).await;

    let token = server.login_token("alice", "wonderland").await;
    assert_eq!(server.me(&token).await.status().as_u16(), 200);

    tokio::time::sleep(Duration::from_millis(2200)).await;
    assert_eq!(server.me(&token).await.status().as_u16(), 401);
    // Lazy expiry removed the record.
    assert_eq!(server.health().await["active_sessions"], 0);
}

#[tokio::test]
async fn test_sweeper_clears_expired_sessions() {
    let server = TestServer::with_ttl(1, 1).await;

    for _ in 0..5 {
        server.login_token("bob", "builder").await;
    }
    assert_eq!(server.health().await["active_sessions"], 5);

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(server.health().await["active_sessions"], 0);
}

#[tokio::test]
async fn test_api_doc_written_at_startup() {
    let server = TestServer::with_api_doc().await;

    let doc = std::fs::read_to_string(server.dir().join("API_DOC.md"))
        .expect("API doc should be written at boot");
    assert!(doc.contains("`POST /login`"));
    assert!(doc.contains("`GET /me`"));
}

#[tokio::test]
async fn test_metrics_exposed() {
    let server = TestServer::start().await;
    server.login_token("alice", "wonderland").await;

    let text = reqwest::get(server.url("/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("tokengate_http_requests_total"));
    assert!(text.contains("tokengate_login_attempts_total{result=\"success\"} 1"));
}
