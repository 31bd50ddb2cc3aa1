//! Peer directory abstraction.
//!
//! # Responsibilities
//! - Resolve the current peer set at the start of each cycle
//! - Keep the in-memory peer set swappable on config reload
//!
//! # Design Decisions
//! - Readers never block writers: the shared set lives behind `ArcSwap`
//! - Iteration order is the configured order, so cycles are deterministic

use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::peer::types::Peer;

/// Errors that prevent a peer set from being resolved.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Backing store could not be read.
    #[error("peer directory unavailable: {0}")]
    Unavailable(String),

    /// Backing store was read but its contents are malformed.
    #[error("invalid peer directory: {0}")]
    Invalid(String),

    /// Two peers share a name.
    #[error("duplicate peer name '{0}'")]
    DuplicateName(String),

    /// The cycle was cancelled before the peer set was resolved.
    #[error("cycle cancelled before the peer set was resolved")]
    Cancelled,
}

/// Source of the current peer set.
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// Return the peers to poll, in a deterministic order.
    async fn peers(&self) -> Result<Vec<Peer>, DirectoryError>;
}

/// Fixed peer set.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    peers: Vec<Peer>,
}

impl StaticDirectory {
    pub fn new(peers: Vec<Peer>) -> Self {
        Self { peers }
    }
}

#[async_trait]
impl PeerDirectory for StaticDirectory {
    async fn peers(&self) -> Result<Vec<Peer>, DirectoryError> {
        Ok(self.peers.clone())
    }
}

/// Peer set that can be replaced at runtime, e.g. after a config reload.
#[derive(Debug)]
pub struct SharedDirectory {
    /// Name of the local agent, filtered out of every snapshot.
    self_name: Option<String>,
    peers: ArcSwap<Vec<Peer>>,
}

impl SharedDirectory {
    pub fn new(self_name: Option<String>, peers: Vec<Peer>) -> Self {
        let peers = without_self(peers, self_name.as_deref());
        Self {
            self_name,
            peers: ArcSwap::from_pointee(peers),
        }
    }

    /// Atomically replace the peer set. Cycles already running keep the old one.
    pub fn replace(&self, peers: Vec<Peer>) {
        let peers = without_self(peers, self.self_name.as_deref());
        tracing::info!(peers = peers.len(), "Peer set replaced");
        self.peers.store(Arc::new(peers));
    }

    /// Number of peers currently known.
    pub fn len(&self) -> usize {
        self.peers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PeerDirectory for SharedDirectory {
    async fn peers(&self) -> Result<Vec<Peer>, DirectoryError> {
        Ok(self.peers.load().as_ref().clone())
    }
}

/// Drop the local agent from a peer list.
pub(crate) fn without_self(peers: Vec<Peer>, self_name: Option<&str>) -> Vec<Peer> {
    match self_name {
        Some(name) => peers.into_iter().filter(|p| p.name != name).collect(),
        None => peers,
    }
}

/// Reject peer lists in which a name appears twice.
pub(crate) fn ensure_unique(peers: &[Peer]) -> Result<(), DirectoryError> {
    let mut seen = HashSet::with_capacity(peers.len());
    for peer in peers {
        if !seen.insert(peer.name.as_str()) {
            return Err(DirectoryError::DuplicateName(peer.name.clone()));
        }
    }
    Ok(())
}
