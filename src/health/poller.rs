//! Peer health polling.
//!
//! # Responsibilities
//! - Resolve the peer set once per cycle
//! - Query every peer independently, concurrently up to a limit
//! - Turn every per-peer error into a `Failed` result and keep going
//! - Stream results to the sink in peer order
//!
//! # Design Decisions
//! - A peer's session lives inside that peer's future; it is dropped (closed)
//!   on every exit path, including cancellation and panics
//! - Connect and query share one per-peer deadline
//! - Cancellation is cooperative: in-flight and not-yet-started peers finish
//!   immediately as `QueryCancelled`, completed peers keep their outcome

use futures_util::{stream, FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PollerConfig;
use crate::health::result::{ErrorKind, PeerHealthResult, PeerState, PollCycle};
use crate::health::snapshot::HealthSnapshot;
use crate::observability::HealthSink;
use crate::peer::{DirectoryError, Peer, PeerDirectory};
use crate::transport::{HealthClientFactory, QueryError};

/// Tunables for a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Budget for connecting to and querying one peer.
    pub query_timeout: Duration,
    /// Peers in flight at once.
    pub max_concurrency: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&PollerConfig::default())
    }
}

impl PollSettings {
    pub fn from_config(config: &PollerConfig) -> Self {
        Self {
            query_timeout: Duration::from_millis(config.query_timeout_ms),
            max_concurrency: config.max_concurrency,
        }
    }
}

/// Why a single peer did not produce a snapshot.
#[derive(Debug)]
struct PeerFailure {
    kind: ErrorKind,
    message: String,
}

impl PeerFailure {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn cancelled(state: PeerState) -> Self {
        Self::new(
            ErrorKind::QueryCancelled,
            format!("cycle cancelled while peer was {}", state),
        )
    }
}

/// Polls every known peer once per cycle.
pub struct PeerHealthPoller {
    directory: Arc<dyn PeerDirectory>,
    clients: Arc<dyn HealthClientFactory>,
    sink: Arc<dyn HealthSink>,
    settings: PollSettings,
}

impl PeerHealthPoller {
    pub fn new(
        directory: Arc<dyn PeerDirectory>,
        clients: Arc<dyn HealthClientFactory>,
        sink: Arc<dyn HealthSink>,
        settings: PollSettings,
    ) -> Self {
        Self {
            directory,
            clients,
            sink,
            settings,
        }
    }

    /// Run one cycle over the current peer set.
    ///
    /// Always completes: per-peer failures become `Failed` results and a
    /// directory failure yields a cycle with no results.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> PollCycle {
        let started = Instant::now();
        let mut cycle = PollCycle::new(Uuid::new_v4(), SystemTime::now());

        let resolved = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DirectoryError::Cancelled),
            peers = self.directory.peers() => peers,
        };

        let peers = match resolved {
            Ok(peers) => peers,
            Err(DirectoryError::Cancelled) => {
                tracing::info!(cycle_id = %cycle.id, "Cycle cancelled before the peer set was resolved");
                cycle.directory_error = Some(DirectoryError::Cancelled.to_string());
                cycle.cancelled = true;
                cycle.duration_ms = started.elapsed().as_millis() as u64;
                self.sink.cycle_completed(&cycle);
                return cycle;
            }
            Err(e) => {
                self.sink.record_directory_failure(&e);
                cycle.directory_error = Some(e.to_string());
                cycle.duration_ms = started.elapsed().as_millis() as u64;
                self.sink.cycle_completed(&cycle);
                return cycle;
            }
        };

        tracing::debug!(cycle_id = %cycle.id, peers = peers.len(), "Polling peers");

        let sink = &self.sink;
        cycle.results = stream::iter(peers)
            .map(|peer| self.poll_peer(peer, cancel))
            .buffered(self.settings.max_concurrency.max(1))
            .inspect(|result| sink.record(result))
            .collect()
            .await;

        cycle.cancelled = cancel.is_cancelled();
        cycle.duration_ms = started.elapsed().as_millis() as u64;
        self.sink.cycle_completed(&cycle);
        cycle
    }

    async fn poll_peer(&self, peer: Peer, cancel: &CancellationToken) -> PeerHealthResult {
        let started = Instant::now();
        let deadline = started + self.settings.query_timeout;

        let outcome = AssertUnwindSafe(self.query_peer(&peer, cancel, deadline))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(PeerFailure::new(
                    ErrorKind::QueryFailed,
                    format!("peer handler panicked: {}", panic_message(panic.as_ref())),
                ))
            });

        let elapsed = started.elapsed();
        match outcome {
            Ok(snapshot) => {
                tracing::trace!(peer = %peer, state = %PeerState::Succeeded, "Peer state");
                PeerHealthResult::ok(peer, snapshot, elapsed)
            }
            Err(failure) => {
                tracing::trace!(peer = %peer, state = %PeerState::Failed, kind = %failure.kind, "Peer state");
                PeerHealthResult::failed(peer, failure.kind, failure.message, elapsed)
            }
        }
    }

    async fn query_peer(
        &self,
        peer: &Peer,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<HealthSnapshot, PeerFailure> {
        if cancel.is_cancelled() {
            return Err(PeerFailure::cancelled(PeerState::Pending));
        }

        tracing::trace!(peer = %peer, state = %PeerState::Connecting, "Peer state");
        let open = AssertUnwindSafe(self.clients.open(&peer.addr)).catch_unwind();
        let mut session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PeerFailure::cancelled(PeerState::Connecting)),
            opened = time::timeout_at(deadline, open) => match opened {
                Ok(Ok(Ok(session))) => session,
                Ok(Ok(Err(e))) => return Err(PeerFailure::new(ErrorKind::ConnectFailed, e.to_string())),
                Ok(Err(panic)) => {
                    return Err(PeerFailure::new(
                        ErrorKind::ConnectFailed,
                        format!("session factory panicked: {}", panic_message(panic.as_ref())),
                    ))
                }
                Err(_) => {
                    return Err(PeerFailure::new(
                        ErrorKind::ConnectFailed,
                        format!(
                            "connect to {} exceeded the {} ms deadline",
                            peer.addr,
                            self.settings.query_timeout.as_millis()
                        ),
                    ))
                }
            },
        };

        tracing::trace!(peer = %peer, state = %PeerState::Querying, "Peer state");
        let queried = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PeerFailure::cancelled(PeerState::Querying)),
            queried = time::timeout_at(deadline, session.query_health(deadline)) => match queried {
                Ok(Ok(snapshot)) => Ok(snapshot),
                Ok(Err(e)) => Err(PeerFailure::new(ErrorKind::QueryFailed, e.to_string())),
                Err(_) => Err(PeerFailure::new(ErrorKind::QueryFailed, QueryError::Timeout.to_string())),
            },
        };

        drop(session);
        queried
    }
}

impl std::fmt::Debug for PeerHealthPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerHealthPoller")
            .field("settings", &self.settings)
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
