//! Periodic expiry sweep.
//!
//! Flows past their TTL are already observed as EXPIRED lazily on read;
//! the sweeper is what actually reaps them in the background so abandoned
//! flows free their owner keys without waiting for the next read.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::time::{interval, Duration as TokioDuration};

use crate::flow::FlowEngine;

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Enable the background sweep
    pub enabled: bool,
    /// Poll interval in seconds between sweeps
    pub poll_interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        SweeperConfig {
            enabled: true,
            poll_interval_secs: 30,
        }
    }
}

/// The background task that reaps expired flows
pub struct Sweeper {
    engine: Arc<FlowEngine>,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(engine: Arc<FlowEngine>, config: SweeperConfig) -> Self {
        Sweeper { engine, config }
    }

    /// Run the sweep loop until the shutdown signal fires
    pub async fn start(self: Arc<Self>, mut shutdown_rx: oneshot::Receiver<()>) {
        if !self.config.enabled {
            log::info!("[sweeper] disabled by configuration");
            return;
        }

        log::info!(
            "[sweeper] started (poll: {}s)",
            self.config.poll_interval_secs
        );

        let mut poll_interval = interval(TokioDuration::from_secs(self.config.poll_interval_secs));

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    log::info!("[sweeper] received shutdown signal");
                    break;
                }
                _ = poll_interval.tick() => {
                    self.tick().await;
                }
            }
        }

        log::info!("[sweeper] stopped");
    }

    /// One sweep pass; re-running against already-expired flows is a no-op
    async fn tick(&self) {
        match self.engine.cleanup_expired(Utc::now()).await {
            Ok(0) => {}
            Ok(reaped) => log::info!("[sweeper] expired {} flow(s)", reaped),
            Err(e) => log::error!("[sweeper] sweep failed: {}", e),
        }
    }
}
