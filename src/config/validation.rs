//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check peer names are unique and addresses are `host:port`
//! - Validate value ranges (timeouts > 0, concurrency > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AgentConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("agent.name must not be empty")]
    EmptyAgentName,

    #[error("peer #{0} has an empty name")]
    EmptyPeerName(usize),

    #[error("duplicate peer name '{0}'")]
    DuplicatePeer(String),

    #[error("peer '{name}' has invalid address '{addr}', expected host:port")]
    InvalidPeerAddr { name: String, addr: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("poller.health_path '{0}' must start with '/'")]
    InvalidHealthPath(String),

    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingApiKey,
}

/// Check a `host:port` peer address.
pub fn is_valid_peer_addr(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().map(|p| p > 0).unwrap_or(false),
        None => false,
    }
}

pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.agent.name.trim().is_empty() {
        errors.push(ValidationError::EmptyAgentName);
    }

    let mut seen = HashSet::new();
    for (index, peer) in config.peers.iter().enumerate() {
        if peer.name.trim().is_empty() {
            errors.push(ValidationError::EmptyPeerName(index));
        } else if !seen.insert(peer.name.as_str()) {
            errors.push(ValidationError::DuplicatePeer(peer.name.clone()));
        }
        if !is_valid_peer_addr(&peer.addr) {
            errors.push(ValidationError::InvalidPeerAddr {
                name: peer.name.clone(),
                addr: peer.addr.clone(),
            });
        }
    }

    let poller = &config.poller;
    if poller.interval_secs == 0 {
        errors.push(ValidationError::Zero("poller.interval_secs"));
    }
    if poller.connect_timeout_ms == 0 {
        errors.push(ValidationError::Zero("poller.connect_timeout_ms"));
    }
    if poller.query_timeout_ms == 0 {
        errors.push(ValidationError::Zero("poller.query_timeout_ms"));
    }
    if poller.cycle_timeout_secs == Some(0) {
        errors.push(ValidationError::Zero("poller.cycle_timeout_secs"));
    }
    if poller.max_concurrency == 0 {
        errors.push(ValidationError::Zero("poller.max_concurrency"));
    }
    if !poller.health_path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath(poller.health_path.clone()));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingApiKey);
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidBindAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
