//! tokengate - opaque bearer-token sessions over HTTP
//!
//! This library provides the credential store, session table and HTTP API
//! behind the tokengate server. Sessions live in memory only.

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod docs;
pub mod metrics;
pub mod service;
pub mod session;
pub mod sweeper;
