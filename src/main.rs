//! Peer heartbeat agent.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────── heartbeat-agent ────────────────────────────┐
//!   │                                                                          │
//!   │  config ──▶ PeerDirectory ──▶ PeerHealthPoller ──▶ HealthSink fan-out    │
//!   │   (TOML,        (inline /          │                 ├─ tracing          │
//!   │    reload)       file)             │                 ├─ metrics          │
//!   │                                    ▼                 └─ latest ──▶ admin │
//!   │                         HealthClientFactory                        API   │
//!   │                           (HTTP session)                                 │
//!   └────────────────────────────────────┼─────────────────────────────────────┘
//!                                        ▼
//!                               peer agents (GET /v1/health)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;

use peer_heartbeat::admin::{self, AdminState};
use peer_heartbeat::config::{load_config, watcher::ConfigWatcher, AgentConfig};
use peer_heartbeat::lifecycle::{signals, startup, Shutdown};
use peer_heartbeat::observability::{logging, metrics};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "heartbeat-agent")]
#[command(about = "Polls peer agents for health snapshots", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the peer list when the configuration file changes.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AgentConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        agent = %config.agent.name,
        "heartbeat-agent starting"
    );
    if args.config.is_none() {
        tracing::warn!("No configuration file given, running with defaults and no peers");
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr, metrics::idle_timeout(&config.poller)) {
            tracing::error!(error = %e, "Failed to start metrics endpoint");
        }
    }

    let agent = startup::build_agent(&config);
    let shutdown = Shutdown::new();

    // Keep the watcher alive for the lifetime of the process.
    let mut _watcher = None;
    if let (Some(path), true) = (&args.config, args.watch) {
        let (watcher, mut updates) = ConfigWatcher::new(path);
        match watcher.run() {
            Ok(w) => {
                _watcher = Some(w);
                let directory = agent.shared_directory.clone();
                let mut current = config.clone();
                tokio::spawn(async move {
                    while let Some(reloaded) = updates.recv().await {
                        startup::apply_reload(directory.as_deref(), &current, &reloaded);
                        current = reloaded;
                    }
                });
            }
            Err(e) => tracing::error!(error = %e, "Config watcher unavailable, hot reload disabled"),
        }
    }

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(&config.agent.name, &config.admin.api_key, agent.latest.clone());
        let admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    let monitor = tokio::spawn(agent.monitor.run(shutdown.subscribe()));

    let signal = signals::shutdown_signal().await;
    tracing::info!(signal, "Shutdown signal received");
    shutdown.trigger();

    if tokio::time::timeout(DRAIN_TIMEOUT, monitor).await.is_err() {
        tracing::warn!("Heartbeat monitor did not stop in time");
    }
    shutdown.drain(DRAIN_TIMEOUT).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
