//! Peer heartbeat agent library.
//!
//! Each agent periodically asks every other peer in its fleet for a health
//! snapshot and records one outcome per peer per cycle.

pub mod admin;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod peer;
pub mod transport;

pub use config::schema::AgentConfig;
pub use health::{HeartbeatMonitor, PeerHealthPoller};
pub use lifecycle::Shutdown;
