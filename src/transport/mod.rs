//! Health RPC transport.
//!
//! # Data Flow
//! ```text
//! PeerHealthPoller
//!     → HealthClientFactory::open(addr)    (connect, bounded by connect timeout)
//!     → HealthSession::query_health(deadline)
//!     → drop(session)                      (connection closed)
//! ```
//!
//! # Design Decisions
//! - One session per peer per cycle; sessions are never pooled or shared
//! - Release is ownership: dropping a session closes its connection, so every
//!   exit path (error, timeout, cancellation, panic) releases exactly once
//! - Traits are object safe so the poller can be driven by mocks in tests

pub mod http;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

use crate::health::snapshot::HealthSnapshot;

pub use http::{HttpClientFactory, HttpSession};

/// Failure to open a session.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Socket-level failure (refused, unreachable, DNS).
    #[error("connect to {addr} failed: {message}")]
    Io { addr: String, message: String },

    /// Connection was not established in time.
    #[error("connect to {addr} timed out after {timeout_ms} ms")]
    Timeout { addr: String, timeout_ms: u64 },

    /// Connection was established but the protocol handshake failed.
    #[error("handshake with {addr} failed: {message}")]
    Handshake { addr: String, message: String },
}

/// Failure of the health call on an open session.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Transport error while sending or receiving.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Peer answered with a non-success status.
    #[error("peer returned status {0}")]
    Status(u16),

    /// Payload could not be decoded into a snapshot.
    #[error("invalid health payload: {0}")]
    Decode(String),

    /// Deadline passed before the peer answered.
    #[error("health query timed out")]
    Timeout,
}

/// Opens scoped sessions to peers.
#[async_trait]
pub trait HealthClientFactory: Send + Sync {
    async fn open(&self, addr: &str) -> Result<Box<dyn HealthSession>, ConnectError>;
}

/// A connection to one peer, used for a single health query.
///
/// Implementations release their connection in `Drop`.
#[async_trait]
pub trait HealthSession: Send {
    async fn query_health(&mut self, deadline: Instant) -> Result<HealthSnapshot, QueryError>;
}
