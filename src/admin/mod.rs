//! Admin API.
//!
//! Read-only view of the latest heartbeat results, protected by a bearer token.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::observability::LatestSink;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub agent_name: Arc<str>,
    pub api_key: Arc<str>,
    pub latest: Arc<LatestSink>,
}

impl AdminState {
    pub fn new(agent_name: &str, api_key: &str, latest: Arc<LatestSink>) -> Self {
        Self {
            agent_name: Arc::from(agent_name),
            api_key: Arc::from(api_key),
            latest,
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/peers", get(get_peers))
        .route("/admin/peers/{name}", get(get_peer))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until shutdown is signalled.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    tracing::info!(address = ?listener.local_addr().ok(), "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
