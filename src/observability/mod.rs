//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! PeerHealthPoller
//!     → HealthSink (sink.rs)
//!         → TracingSink  → logging.rs (structured log events)
//!         → MetricsSink  → metrics.rs (gauges, counters, histograms)
//!         → LatestSink   → admin API (latest result per peer)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - The poller never logs results itself; everything flows through the sink
//! - Sinks are synchronous and cheap; they must not block the cycle
//! - Labels are per peer name, bounded by fleet size

pub mod logging;
pub mod metrics;
pub mod sink;

pub use sink::{FanoutSink, HealthSink, LatestSink, MetricsSink, TracingSink};
