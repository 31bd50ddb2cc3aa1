//! Result sinks.
//!
//! # Responsibilities
//! - Receive each per-peer result as soon as it is produced
//! - Receive directory-level failures
//! - Fan results out to logs, metrics, and the admin view
//!
//! # Design Decisions
//! - `record` takes a borrow; sinks copy what they keep
//! - Sinks must be safe to share between concurrent peer handlers

use arc_swap::ArcSwapOption;
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::health::result::{ErrorKind, PeerHealthResult, PollCycle};
use crate::observability::metrics;
use crate::peer::DirectoryError;

/// Consumer of polling outcomes.
pub trait HealthSink: Send + Sync {
    /// Called once per peer per cycle, in peer iteration order.
    fn record(&self, result: &PeerHealthResult);

    /// Called when the peer set could not be resolved.
    fn record_directory_failure(&self, error: &DirectoryError);

    /// Called after the last result of a cycle.
    fn cycle_completed(&self, _cycle: &PollCycle) {}
}

/// Writes results as structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl HealthSink for TracingSink {
    fn record(&self, result: &PeerHealthResult) {
        match result {
            PeerHealthResult::Ok { peer, snapshot, elapsed_ms } => {
                tracing::debug!(
                    peer = %peer.name,
                    os_name = %snapshot.os_name,
                    os_version = %snapshot.os_version,
                    uptime = snapshot.uptime,
                    cpus = snapshot.cpus,
                    memory_total = snapshot.memory_total,
                    memory_free = snapshot.memory_free,
                    memory_used = snapshot.memory_used,
                    containers = snapshot.containers,
                    images = snapshot.images,
                    elapsed_ms = *elapsed_ms,
                    "peer health"
                );
            }
            PeerHealthResult::Failed { peer, kind: kind @ ErrorKind::QueryCancelled, message, elapsed_ms } => {
                tracing::info!(
                    peer = %peer.name,
                    addr = %peer.addr,
                    kind = %kind,
                    error = %message,
                    elapsed_ms = *elapsed_ms,
                    "Peer health query cancelled"
                );
            }
            PeerHealthResult::Failed { peer, kind, message, elapsed_ms } => {
                tracing::warn!(
                    peer = %peer.name,
                    addr = %peer.addr,
                    kind = %kind,
                    error = %message,
                    elapsed_ms = *elapsed_ms,
                    "Error communicating with peer"
                );
            }
        }
    }

    fn record_directory_failure(&self, error: &DirectoryError) {
        tracing::error!(error = %error, "Error getting peers");
    }

    fn cycle_completed(&self, cycle: &PollCycle) {
        tracing::debug!(
            cycle_id = %cycle.id,
            peers = cycle.results.len(),
            succeeded = cycle.succeeded(),
            failed = cycle.failed(),
            duration_ms = cycle.duration_ms,
            "Heartbeat cycle complete"
        );
    }
}

/// Publishes results as Prometheus metrics.
///
/// Peers that drop out of a resolved peer set are marked down once; the
/// exporter's idle timeout then expires their series.
#[derive(Debug, Default)]
pub struct MetricsSink {
    known: DashSet<String>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HealthSink for MetricsSink {
    fn record(&self, result: &PeerHealthResult) {
        let peer = &result.peer().name;
        if !self.known.contains(peer) {
            self.known.insert(peer.clone());
        }
        match result {
            PeerHealthResult::Ok { snapshot, .. } => metrics::record_peer_snapshot(peer, snapshot),
            PeerHealthResult::Failed { kind, .. } => metrics::record_peer_failure(peer, *kind),
        }
        metrics::record_query_duration(peer, result.elapsed());
    }

    fn record_directory_failure(&self, _error: &DirectoryError) {
        metrics::record_directory_failure();
    }

    fn cycle_completed(&self, cycle: &PollCycle) {
        metrics::record_cycle(cycle);
        if !cycle.peer_set_resolved() {
            return;
        }
        let current: HashSet<&str> = cycle.results.iter().map(|r| r.peer().name.as_str()).collect();
        self.known.retain(|name| {
            let present = current.contains(name.as_str());
            if !present {
                metrics::record_peer_departed(name);
            }
            present
        });
    }
}

/// Summary of the most recent cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub id: Uuid,
    pub started_at_ms: u64,
    pub duration_ms: u64,
    pub peers: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub directory_error: Option<String>,
    pub cancelled: bool,
}

impl From<&PollCycle> for CycleSummary {
    fn from(cycle: &PollCycle) -> Self {
        Self {
            id: cycle.id,
            started_at_ms: cycle.started_at_ms,
            duration_ms: cycle.duration_ms,
            peers: cycle.results.len(),
            succeeded: cycle.succeeded(),
            failed: cycle.failed(),
            directory_error: cycle.directory_error.clone(),
            cancelled: cycle.cancelled,
        }
    }
}

/// Keeps the latest result per peer for the admin API.
#[derive(Debug, Default)]
pub struct LatestSink {
    results: DashMap<String, PeerHealthResult>,
    last_cycle: ArcSwapOption<CycleSummary>,
}

impl LatestSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest results sorted by peer name.
    pub fn results(&self) -> Vec<PeerHealthResult> {
        let mut results: Vec<_> = self.results.iter().map(|e| e.value().clone()).collect();
        results.sort_by(|a, b| a.peer().name.cmp(&b.peer().name));
        results
    }

    pub fn get(&self, peer: &str) -> Option<PeerHealthResult> {
        self.results.get(peer).map(|e| e.value().clone())
    }

    pub fn last_cycle(&self) -> Option<Arc<CycleSummary>> {
        self.last_cycle.load_full()
    }
}

impl HealthSink for LatestSink {
    fn record(&self, result: &PeerHealthResult) {
        self.results.insert(result.peer().name.clone(), result.clone());
    }

    fn record_directory_failure(&self, _error: &DirectoryError) {}

    fn cycle_completed(&self, cycle: &PollCycle) {
        // Forget peers that left the fleet; keep everything when the set is unknown.
        if cycle.peer_set_resolved() {
            let current: HashSet<&str> = cycle.results.iter().map(|r| r.peer().name.as_str()).collect();
            self.results.retain(|name, _| current.contains(name.as_str()));
        }
        self.last_cycle.store(Some(Arc::new(CycleSummary::from(cycle))));
    }
}

/// Forwards every call to each inner sink in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn HealthSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn HealthSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn HealthSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl HealthSink for FanoutSink {
    fn record(&self, result: &PeerHealthResult) {
        for sink in &self.sinks {
            sink.record(result);
        }
    }

    fn record_directory_failure(&self, error: &DirectoryError) {
        for sink in &self.sinks {
            sink.record_directory_failure(error);
        }
    }

    fn cycle_completed(&self, cycle: &PollCycle) {
        for sink in &self.sinks {
            sink.cycle_completed(cycle);
        }
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink").field("sinks", &self.sinks.len()).finish()
    }
}
