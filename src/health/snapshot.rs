//! Health snapshot reported by a peer.

use serde::{Deserialize, Serialize};

/// Point-in-time resource and workload facts reported by a peer.
///
/// Numbers are taken as reported; the remote agent owns the accounting, so
/// `memory_used + memory_free` is not required to equal `memory_total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSnapshot {
    pub os_name: String,
    pub os_version: String,
    /// Agent process uptime in seconds.
    pub uptime: u64,
    /// Logical CPU count.
    pub cpus: u32,
    /// Bytes.
    pub memory_total: u64,
    pub memory_free: u64,
    pub memory_used: u64,
    /// Running containers.
    pub containers: u64,
    /// Stored images.
    pub images: u64,
}
