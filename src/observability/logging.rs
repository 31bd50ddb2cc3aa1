//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Select the output format (text or JSON)
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - JSON format for production, text format for development
//! - One-shot CLI commands log to stderr so stdout stays machine readable

use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Build the default filter directive for the configured level.
pub fn default_directive(level: &str) -> String {
    format!(
        "peer_heartbeat={level},heartbeat_agent={level},heartbeat_cli={level},tower_http=info"
    )
}

/// Install the global subscriber writing to stdout. Call once, from a binary.
pub fn init_logging(config: &ObservabilityConfig) {
    install(config, std::io::stdout);
}

/// Install the global subscriber writing to stderr.
pub fn init_stderr_logging(config: &ObservabilityConfig) {
    install(config, std::io::stderr);
}

fn install<W>(config: &ObservabilityConfig, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(writer)).init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(writer)).init(),
    }
}
