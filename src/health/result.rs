//! Per-peer outcomes and the cycle that groups them.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::health::snapshot::HealthSnapshot;
use crate::peer::Peer;

/// Failure taxonomy of a polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Peer set could not be obtained. Fatal to the cycle only.
    DirectoryUnavailable,
    /// Session could not be opened to the peer.
    ConnectFailed,
    /// Health call failed, returned garbage, or missed its deadline.
    QueryFailed,
    /// The cycle was cancelled before the peer finished.
    QueryCancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DirectoryUnavailable => "directory_unavailable",
            ErrorKind::ConnectFailed => "connect_failed",
            ErrorKind::QueryFailed => "query_failed",
            ErrorKind::QueryCancelled => "query_cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a single peer within a cycle.
///
/// ```text
/// Pending → Connecting → Querying → Succeeded
///    │          │           │
///    └──────────┴───────────┴────→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Pending,
    Connecting,
    Querying,
    Succeeded,
    Failed,
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeerState::Pending => "pending",
            PeerState::Connecting => "connecting",
            PeerState::Querying => "querying",
            PeerState::Succeeded => "succeeded",
            PeerState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of polling one peer in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PeerHealthResult {
    Ok {
        peer: Peer,
        snapshot: HealthSnapshot,
        elapsed_ms: u64,
    },
    Failed {
        peer: Peer,
        kind: ErrorKind,
        message: String,
        elapsed_ms: u64,
    },
}

impl PeerHealthResult {
    pub fn ok(peer: Peer, snapshot: HealthSnapshot, elapsed: Duration) -> Self {
        Self::Ok {
            peer,
            snapshot,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failed(peer: Peer, kind: ErrorKind, message: impl Into<String>, elapsed: Duration) -> Self {
        Self::Failed {
            peer,
            kind,
            message: message.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn peer(&self) -> &Peer {
        match self {
            Self::Ok { peer, .. } | Self::Failed { peer, .. } => peer,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn snapshot(&self) -> Option<&HealthSnapshot> {
        match self {
            Self::Ok { snapshot, .. } => Some(snapshot),
            Self::Failed { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Ok { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Ok { .. } => None,
            Self::Failed { message, .. } => Some(message),
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Ok { elapsed_ms, .. } | Self::Failed { elapsed_ms, .. } => {
                Duration::from_millis(*elapsed_ms)
            }
        }
    }
}

/// All results produced from one directory snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PollCycle {
    pub id: Uuid,
    /// Milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    pub duration_ms: u64,
    /// One entry per resolved peer, in directory order.
    pub results: Vec<PeerHealthResult>,
    /// Set when the peer set could not be resolved; `results` is then empty.
    pub directory_error: Option<String>,
    /// The cycle token fired before the cycle finished.
    pub cancelled: bool,
}

impl PollCycle {
    pub(crate) fn new(id: Uuid, started_at: SystemTime) -> Self {
        let started_at_ms = started_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            id,
            started_at_ms,
            duration_ms: 0,
            results: Vec::new(),
            directory_error: None,
            cancelled: false,
        }
    }

    /// The directory failed on its own, not because the cycle was cancelled.
    pub fn is_directory_failure(&self) -> bool {
        self.directory_error.is_some() && !self.cancelled
    }

    /// `results` covers the whole peer set.
    pub fn peer_set_resolved(&self) -> bool {
        self.directory_error.is_none()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Count of failures of the given kind.
    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        if kind == ErrorKind::DirectoryUnavailable {
            return usize::from(self.is_directory_failure());
        }
        self.results.iter().filter(|r| r.kind() == Some(kind)).count()
    }

    pub fn result_for(&self, name: &str) -> Option<&PeerHealthResult> {
        self.results.iter().find(|r| r.peer().name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_accessors() {
        let ok = PeerHealthResult::ok(
            Peer::new("a", "10.0.0.1:7946"),
            HealthSnapshot {
                cpus: 4,
                ..Default::default()
            },
            Duration::from_millis(12),
        );
        assert!(ok.is_ok());
        assert_eq!(ok.kind(), None);
        assert_eq!(ok.snapshot().map(|s| s.cpus), Some(4));
        assert_eq!(ok.elapsed(), Duration::from_millis(12));

        let failed = PeerHealthResult::failed(
            Peer::new("b", "10.0.0.2:7946"),
            ErrorKind::ConnectFailed,
            "connection refused",
            Duration::ZERO,
        );
        assert!(!failed.is_ok());
        assert_eq!(failed.kind(), Some(ErrorKind::ConnectFailed));
        assert_eq!(failed.message(), Some("connection refused"));
        assert_eq!(failed.peer().name, "b");
    }

    #[test]
    fn test_result_serializes_tagged() {
        let failed = PeerHealthResult::failed(
            Peer::new("b", "10.0.0.2:7946"),
            ErrorKind::QueryCancelled,
            "cancelled while querying",
            Duration::from_millis(3),
        );
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["kind"], "query_cancelled");
        assert_eq!(json["peer"]["name"], "b");
    }

    #[test]
    fn test_cycle_counts() {
        let mut cycle = PollCycle::new(Uuid::new_v4(), SystemTime::now());
        cycle.results.push(PeerHealthResult::ok(
            Peer::new("a", "a:1"),
            HealthSnapshot::default(),
            Duration::ZERO,
        ));
        cycle.results.push(PeerHealthResult::failed(
            Peer::new("b", "b:1"),
            ErrorKind::QueryFailed,
            "boom",
            Duration::ZERO,
        ));
        assert_eq!(cycle.succeeded(), 1);
        assert_eq!(cycle.failed(), 1);
        assert_eq!(cycle.count_kind(ErrorKind::QueryFailed), 1);
        assert_eq!(cycle.count_kind(ErrorKind::DirectoryUnavailable), 0);
        assert!(cycle.result_for("b").is_some());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ErrorKind::ConnectFailed.to_string(), "connect_failed");
        assert_eq!(PeerState::Querying.to_string(), "querying");
    }

    #[test]
    fn test_cancelled_cycle_is_not_a_directory_failure() {
        let mut cycle = PollCycle::new(Uuid::new_v4(), SystemTime::now());
        cycle.directory_error = Some("cycle cancelled before the peer set was resolved".into());
        cycle.cancelled = true;

        assert!(!cycle.is_directory_failure());
        assert!(!cycle.peer_set_resolved());
        assert_eq!(cycle.count_kind(ErrorKind::DirectoryUnavailable), 0);

        cycle.cancelled = false;
        assert!(cycle.is_directory_failure());
        assert_eq!(cycle.count_kind(ErrorKind::DirectoryUnavailable), 1);
    }
}
