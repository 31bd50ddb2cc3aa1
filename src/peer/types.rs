//! Peer identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PeerConfig;

/// Another node of the agent fleet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// Unique name within a cycle.
    pub name: String,
    /// Network endpoint (`host:port`).
    pub addr: String,
}

impl Peer {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.addr)
    }
}

impl From<PeerConfig> for Peer {
    fn from(config: PeerConfig) -> Self {
        Self {
            name: config.name,
            addr: config.addr,
        }
    }
}

impl From<&PeerConfig> for Peer {
    fn from(config: &PeerConfig) -> Self {
        Self::new(config.name.clone(), config.addr.clone())
    }
}
