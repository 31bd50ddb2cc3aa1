use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use peer_heartbeat::config::load_config;
use peer_heartbeat::lifecycle::{signals, startup};
use peer_heartbeat::observability::logging;

#[derive(Parser)]
#[command(name = "heartbeat-cli")]
#[command(about = "Management CLI for the peer heartbeat agent", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "HEARTBEAT_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show agent status and the last cycle summary
    Status,
    /// List the latest health result of every peer
    Peers,
    /// Show the latest health result of one peer
    Peer { name: String },
    /// Run a single heartbeat cycle locally and print the results
    Poll {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Status => "/admin/status".to_string(),
        Commands::Peers => "/admin/peers".to_string(),
        Commands::Peer { name } => format!("/admin/peers/{}", name),
        Commands::Poll { config } => return poll_once(&config).await,
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = reqwest::Client::new()
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn poll_once(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(path)?;
    config.observability.metrics_enabled = false;
    logging::init_stderr_logging(&config.observability);

    let agent = startup::build_agent(&config);
    let cancel = CancellationToken::new();

    let cycle = agent.monitor.run_once(&cancel);
    tokio::pin!(cycle);
    let cycle = tokio::select! {
        cycle = &mut cycle => cycle,
        signal = signals::shutdown_signal() => {
            eprintln!("{} received, cancelling outstanding peers", signal);
            cancel.cancel();
            cycle.as_mut().await
        }
    };

    println!("{}", serde_json::to_string_pretty(&cycle)?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
