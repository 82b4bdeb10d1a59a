//! Background task that periodically drops expired sessions.

use crate::metrics::Metrics;
use crate::session::SessionTable;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawn the sweeper. It runs until `shutdown` is cancelled.
pub fn spawn_sweeper(
    sessions: Arc<SessionTable>,
    interval: Duration,
    metrics: Option<Metrics>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can have expired yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Session sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = sessions.sweep_expired();
                    if removed > 0 {
                        info!("Swept {} expired session(s), {} remaining", removed, sessions.len());
                        if let Some(m) = &metrics {
                            m.sessions_swept_total.inc_by(removed as u64);
                        }
                    }
                }
            }
        }
    })
}
