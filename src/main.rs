//! tokengate - opaque bearer-token session server

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokengate::api::{self, handlers::AppState};
use tokengate::config::Config;
use tokengate::docs::write_api_doc;
use tokengate::sweeper::spawn_sweeper;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// tokengate - login, logout and whoami over opaque bearer tokens
#[derive(Parser, Debug)]
#[command(name = "tokengate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Write Markdown API documentation to FILE at startup (overrides config)
    #[arg(long, value_name = "FILE")]
    api_doc: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing. The filter is swapped for the configured
    // log_level once the config is loaded, unless RUST_LOG or --verbose wins.
    let log_level = if cli.verbose {
        "tokengate=trace,tower_http=trace"
    } else {
        "tokengate=debug,tower_http=debug"
    };
    let env_filter = EnvFilter::try_from_default_env();
    let filter_from_env = env_filter.is_ok();
    let (filter, log_reload) = reload::Layer::new(env_filter.unwrap_or_else(|_| log_level.into()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from file if specified, otherwise use default loading
    let mut config = if let Some(ref path) = cli.config {
        let mut config = Config::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config
    } else {
        Config::load()?
    };

    // CLI overrides
    if let Some(ref addr) = cli.listen {
        config.listen_addr = addr.parse()?;
    }
    if let Some(ref path) = cli.api_doc {
        config.api_doc_path = Some(path.clone());
    }
    config.validate()?;

    if !filter_from_env && !cli.verbose {
        match config.log_level.parse::<EnvFilter>() {
            Ok(filter) => {
                if let Err(e) = log_reload.reload(filter) {
                    warn!("Failed to apply log level '{}': {}", config.log_level, e);
                }
            }
            Err(e) => warn!("Invalid log level '{}': {}", config.log_level, e),
        }
    }

    info!(
        "Starting tokengate {} (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("TOKENGATE_BUILD_TIME")
    );
    info!("  Listen address: {}", config.listen_addr);
    info!("  Users: {}", config.users.len());
    info!("  Session TTL: {}s", config.session_ttl_secs);
    info!("  Sweep interval: {}s", config.sweep_interval_secs);
    info!(
        "  Metrics: {}",
        if config.metrics_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    if config.uses_demo_credentials() {
        warn!("  Using the built-in demo account only; configure [users] for real deployments");
    }
    info!("  Sessions are kept in memory; a restart logs every user out");

    if let Some(ref path) = config.api_doc_path {
        write_api_doc(path, config.session_ttl_secs);
    }

    let state = Arc::new(AppState::from_config(&config));

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        state.service.sessions().clone(),
        config.sweep_interval(),
        state.metrics.clone(),
        shutdown.clone(),
    );

    let app = api::router(state).layer(TraceLayer::new_for_http());

    // Start server with graceful shutdown
    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("tokengate listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    sweeper.await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
