//! Periodic heartbeat scheduling.
//!
//! # Responsibilities
//! - Run one polling cycle per interval
//! - Bound every cycle with a deadline
//! - Cancel the in-flight cycle on shutdown and let it drain

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::PollerConfig;
use crate::health::poller::PeerHealthPoller;
use crate::health::result::PollCycle;

pub struct HeartbeatMonitor {
    poller: PeerHealthPoller,
    config: PollerConfig,
}

impl HeartbeatMonitor {
    pub fn new(poller: PeerHealthPoller, config: PollerConfig) -> Self {
        Self { poller, config }
    }

    /// Deadline for a whole cycle; defaults to the interval so cycles never overlap.
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.config.cycle_timeout_secs.unwrap_or(self.config.interval_secs))
    }

    /// Run a single cycle, cancelling outstanding peers once the cycle deadline passes.
    pub async fn run_once(&self, cancel: &CancellationToken) -> PollCycle {
        let cycle_cancel = cancel.child_token();
        let cycle = self.poller.run_cycle(&cycle_cancel);
        tokio::pin!(cycle);

        tokio::select! {
            result = &mut cycle => result,
            _ = time::sleep(self.cycle_timeout()) => {
                tracing::warn!(
                    timeout_secs = self.cycle_timeout().as_secs(),
                    "Heartbeat cycle exceeded its deadline, cancelling outstanding peers"
                );
                cycle_cancel.cancel();
                cycle.as_mut().await
            }
        }
    }

    /// Run cycles until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Peer heartbeat disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            query_timeout_ms = self.config.query_timeout_ms,
            max_concurrency = self.config.max_concurrency,
            "Heartbeat monitor starting"
        );

        let root = CancellationToken::new();
        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let cycle = self.run_once(&root);
                    tokio::pin!(cycle);

                    tokio::select! {
                        _ = &mut cycle => {}
                        _ = shutdown.recv() => {
                            tracing::info!("Shutdown during heartbeat cycle, cancelling outstanding peers");
                            root.cancel();
                            cycle.as_mut().await;
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Heartbeat monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for HeartbeatMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatMonitor")
            .field("poller", &self.poller)
            .field("interval_secs", &self.config.interval_secs)
            .finish()
    }
}
