//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the heartbeat agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Identity of the local agent.
    pub agent: AgentIdentity,

    /// Inline peer list, used when no peers file is configured.
    pub peers: Vec<PeerConfig>,

    /// Peer directory settings.
    pub directory: DirectoryConfig,

    /// Polling settings.
    pub poller: PollerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Identity of the local agent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AgentIdentity {
    /// Name of this node; excluded from its own peer set.
    pub name: String,
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
        }
    }
}

/// A peer entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PeerConfig {
    /// Unique peer name.
    pub name: String,

    /// Peer agent address (e.g., "10.0.0.2:7946").
    pub addr: String,
}

/// Peer directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DirectoryConfig {
    /// TOML file with `[[peers]]` entries, re-read every cycle.
    pub peers_file: Option<String>,
}

/// Polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollerConfig {
    /// Enable the periodic heartbeat.
    pub enabled: bool,

    /// Seconds between cycle starts.
    pub interval_secs: u64,

    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-peer budget (connect + query) in milliseconds.
    pub query_timeout_ms: u64,

    /// Whole-cycle deadline in seconds (defaults to `interval_secs`).
    pub cycle_timeout_secs: Option<u64>,

    /// Peers queried concurrently.
    pub max_concurrency: usize,

    /// Path of the health endpoint on peer agents.
    pub health_path: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            connect_timeout_ms: 2_000,
            query_timeout_ms: 5_000,
            cycle_timeout_secs: None,
            max_concurrency: 16,
            health_path: "/v1/health".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
