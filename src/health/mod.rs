//! Peer health subsystem.
//!
//! # Data Flow
//! ```text
//! HeartbeatMonitor (monitor.rs):
//!     Periodic timer
//!     → PeerHealthPoller::run_cycle (poller.rs)
//!         → PeerDirectory::peers()
//!         → per peer: open session → query_health → drop session
//!         → PeerHealthResult (result.rs) → HealthSink
//!     → PollCycle summary → HealthSink::cycle_completed
//!
//! Per-peer state machine (result.rs):
//!     Pending → Connecting → Querying → {Succeeded | Failed}
//! ```
//!
//! # Design Decisions
//! - One peer's failure never stops the others from being polled
//! - No state survives a cycle; retry policy is the scheduler's interval
//! - Snapshot fields are a closed set (snapshot.rs)

pub mod monitor;
pub mod poller;
pub mod result;
pub mod snapshot;

pub use monitor::HeartbeatMonitor;
pub use poller::{PeerHealthPoller, PollSettings};
pub use result::{ErrorKind, PeerHealthResult, PeerState, PollCycle};
pub use snapshot::HealthSnapshot;
