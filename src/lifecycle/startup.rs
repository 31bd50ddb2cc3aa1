//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the peer directory, transport, and sinks from configuration
//! - Wire them into a `PeerHealthPoller` and `HeartbeatMonitor`
//! - Apply reloaded configuration to the live peer set
//!
//! # Design Decisions
//! - Fail fast: config errors are caught before anything is built
//! - Inline peers are hot reloaded; a peers file is re-read every cycle anyway

use std::sync::Arc;

use crate::config::AgentConfig;
use crate::health::{HeartbeatMonitor, PeerHealthPoller, PollSettings};
use crate::observability::{FanoutSink, LatestSink, MetricsSink, TracingSink};
use crate::peer::{FileDirectory, Peer, PeerDirectory, SharedDirectory};
use crate::transport::{HealthClientFactory, HttpClientFactory};

/// A fully wired agent, ready to run.
#[derive(Debug)]
pub struct Agent {
    pub monitor: HeartbeatMonitor,
    /// Latest result per peer, shared with the admin API.
    pub latest: Arc<LatestSink>,
    /// Present when peers come from the agent config itself.
    pub shared_directory: Option<Arc<SharedDirectory>>,
}

/// Build an agent that talks HTTP to its peers.
pub fn build_agent(config: &AgentConfig) -> Agent {
    build_agent_with(config, Arc::new(HttpClientFactory::from_config(&config.poller)))
}

/// Build an agent on top of an arbitrary transport.
pub fn build_agent_with(config: &AgentConfig, clients: Arc<dyn HealthClientFactory>) -> Agent {
    let self_name = Some(config.agent.name.clone());

    let (directory, shared_directory): (Arc<dyn PeerDirectory>, Option<Arc<SharedDirectory>>) =
        match &config.directory.peers_file {
            Some(path) => {
                let file = FileDirectory::new(path, self_name);
                tracing::info!(path = %file.path().display(), "Using file-backed peer directory");
                (Arc::new(file), None)
            }
            None => {
                let peers = config.peers.iter().map(Peer::from).collect();
                let shared = Arc::new(SharedDirectory::new(self_name, peers));
                if shared.is_empty() {
                    tracing::warn!("No peers configured; cycles will report nothing until a reload adds some");
                } else {
                    tracing::info!(peers = shared.len(), "Using configured peer list");
                }
                (shared.clone() as Arc<dyn PeerDirectory>, Some(shared))
            }
        };

    let latest = Arc::new(LatestSink::new());
    let mut sink = FanoutSink::default().with(Arc::new(TracingSink));
    if config.observability.metrics_enabled {
        sink = sink.with(Arc::new(MetricsSink::new()));
    }
    let sink = sink.with(latest.clone());

    let poller = PeerHealthPoller::new(
        directory,
        clients,
        Arc::new(sink),
        PollSettings::from_config(&config.poller),
    );

    Agent {
        monitor: HeartbeatMonitor::new(poller, config.poller.clone()),
        latest,
        shared_directory,
    }
}

/// Apply a reloaded configuration. Returns `true` if a restart is needed
/// for some of the changes to take effect.
pub fn apply_reload(directory: Option<&SharedDirectory>, current: &AgentConfig, reloaded: &AgentConfig) -> bool {
    if let Some(directory) = directory {
        if current.peers != reloaded.peers {
            directory.replace(reloaded.peers.iter().map(Peer::from).collect());
        }
    }

    let restart_needed = current.agent != reloaded.agent
        || current.poller != reloaded.poller
        || current.directory != reloaded.directory
        || current.observability != reloaded.observability
        || current.admin != reloaded.admin;

    if restart_needed {
        tracing::warn!("Configuration changed outside [[peers]]; restart the agent to apply it");
    }
    restart_needed
}
