//! Metrics collection and exposition.
//!
//! # Metrics
//! - `peer_health_up` (gauge): 1=last query succeeded, 0=failed
//! - `peer_cpus`, `peer_uptime_seconds`, `peer_containers`, `peer_images` (gauges)
//! - `peer_memory_{total,free,used}_bytes` (gauges)
//! - `peer_health_failures_total` (counter): by peer and error kind
//! - `peer_health_query_duration_seconds` (histogram): per-peer latency
//! - `heartbeat_cycles_total` (counter), `heartbeat_cycle_peers` (gauge)
//! - `heartbeat_cycle_duration_seconds` (histogram)
//! - `heartbeat_directory_failures_total` (counter)
//!
//! Gauges and histograms that stop being updated are dropped from the scrape
//! output after an idle timeout, so peers that leave the fleet disappear.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use metrics_util::MetricKindMask;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config::PollerConfig;
use crate::health::result::{ErrorKind, PollCycle};
use crate::health::snapshot::HealthSnapshot;

/// Cycles a series may miss before it is expired.
const IDLE_CYCLES: u64 = 3;

/// How long a per-peer series survives without updates.
pub fn idle_timeout(poller: &PollerConfig) -> Duration {
    let period = poller.cycle_timeout_secs.unwrap_or(0).max(poller.interval_secs).max(1);
    Duration::from_secs(period.saturating_mul(IDLE_CYCLES))
}

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr, idle_timeout: Duration) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .idle_timeout(MetricKindMask::GAUGE | MetricKindMask::HISTOGRAM, Some(idle_timeout))
        .install()?;
    tracing::info!(address = %addr, idle_timeout_secs = idle_timeout.as_secs(), "Metrics endpoint listening");
    Ok(())
}

pub fn record_peer_snapshot(peer: &str, snapshot: &HealthSnapshot) {
    let peer = peer.to_string();
    gauge!("peer_health_up", "peer" => peer.clone()).set(1.0);
    gauge!("peer_cpus", "peer" => peer.clone()).set(snapshot.cpus as f64);
    gauge!("peer_uptime_seconds", "peer" => peer.clone()).set(snapshot.uptime as f64);
    gauge!("peer_memory_total_bytes", "peer" => peer.clone()).set(snapshot.memory_total as f64);
    gauge!("peer_memory_free_bytes", "peer" => peer.clone()).set(snapshot.memory_free as f64);
    gauge!("peer_memory_used_bytes", "peer" => peer.clone()).set(snapshot.memory_used as f64);
    gauge!("peer_containers", "peer" => peer.clone()).set(snapshot.containers as f64);
    gauge!("peer_images", "peer" => peer).set(snapshot.images as f64);
}

pub fn record_peer_failure(peer: &str, kind: ErrorKind) {
    let peer = peer.to_string();
    gauge!("peer_health_up", "peer" => peer.clone()).set(0.0);
    counter!("peer_health_failures_total", "peer" => peer, "kind" => kind.as_str()).increment(1);
}

/// Mark a peer that left the peer set as down until its series expire.
pub fn record_peer_departed(peer: &str) {
    gauge!("peer_health_up", "peer" => peer.to_string()).set(0.0);
}

pub fn record_query_duration(peer: &str, elapsed: Duration) {
    histogram!("peer_health_query_duration_seconds", "peer" => peer.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_cycle(cycle: &PollCycle) {
    counter!("heartbeat_cycles_total").increment(1);
    gauge!("heartbeat_cycle_peers").set(cycle.results.len() as f64);
    histogram!("heartbeat_cycle_duration_seconds")
        .record(Duration::from_millis(cycle.duration_ms).as_secs_f64());
}

pub fn record_directory_failure() {
    counter!("heartbeat_directory_failures_total").increment(1);
}
