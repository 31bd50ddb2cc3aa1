use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::health::PeerHealthResult;
use crate::observability::sink::CycleSummary;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub agent: String,
    pub status: &'static str,
    pub last_cycle: Option<CycleSummary>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let last_cycle = state.latest.last_cycle().map(|c| c.as_ref().clone());
    let status = match &last_cycle {
        None => "starting",
        Some(c) if c.directory_error.is_some() && !c.cancelled => "degraded",
        Some(_) => "operational",
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        agent: state.agent_name.to_string(),
        status,
        last_cycle,
    })
}

pub async fn get_peers(State(state): State<AdminState>) -> Json<Vec<PeerHealthResult>> {
    Json(state.latest.results())
}

pub async fn get_peer(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<PeerHealthResult>, StatusCode> {
    state.latest.get(&name).map(Json).ok_or(StatusCode::NOT_FOUND)
}
