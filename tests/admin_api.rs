//! Admin API routing and authentication.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tokio_util::sync::CancellationToken;

use peer_heartbeat::admin::{setup_admin_router, AdminState};
use peer_heartbeat::health::{HealthSnapshot, PeerHealthPoller, PollSettings};
use peer_heartbeat::observability::LatestSink;
use peer_heartbeat::peer::{DirectoryError, Peer, PeerDirectory, StaticDirectory};

mod common;
use common::{Script, ScriptedFactory};

const KEY: &str = "test-admin-key";

async fn populated_state() -> AdminState {
    let latest = Arc::new(LatestSink::new());
    let poller = PeerHealthPoller::new(
        Arc::new(StaticDirectory::new(vec![
            Peer::new("node-b", "b"),
            Peer::new("node-a", "a"),
        ])),
        Arc::new(
            ScriptedFactory::new()
                .with("a", Script::Healthy(HealthSnapshot { cpus: 4, ..Default::default() }))
                .with("b", Script::ConnectRefused),
        ),
        latest.clone(),
        PollSettings {
            query_timeout: Duration::from_secs(1),
            max_concurrency: 2,
        },
    );
    poller.run_cycle(&CancellationToken::new()).await;

    AdminState::new("node-self", KEY, latest)
}

struct BrokenDirectory;

#[async_trait]
impl PeerDirectory for BrokenDirectory {
    async fn peers(&self) -> Result<Vec<Peer>, DirectoryError> {
        Err(DirectoryError::Unavailable("membership service unreachable".into()))
    }
}

async fn state_after_cycle(directory: Arc<dyn PeerDirectory>, cancel: &CancellationToken) -> AdminState {
    let latest = Arc::new(LatestSink::new());
    let poller = PeerHealthPoller::new(
        directory,
        Arc::new(ScriptedFactory::new()),
        latest.clone(),
        PollSettings::default(),
    );
    poller.run_cycle(cancel).await;
    AdminState::new("node-self", KEY, latest)
}

fn get(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let app = setup_admin_router(populated_state().await);

    let res = app.clone().oneshot(get("/admin/status", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.oneshot(get("/admin/status", Some("wrong"))).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_key_never_authenticates() {
    let app = setup_admin_router(AdminState::new("node-self", "", Arc::new(LatestSink::new())));
    let res = app.oneshot(get("/admin/status", Some(""))).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_reports_last_cycle() {
    let app = setup_admin_router(populated_state().await);
    let res = app.oneshot(get("/admin/status", Some(KEY))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json(res).await;
    assert_eq!(body["agent"], "node-self");
    assert_eq!(body["status"], "operational");
    assert_eq!(body["last_cycle"]["peers"], 2);
    assert_eq!(body["last_cycle"]["succeeded"], 1);
    assert_eq!(body["last_cycle"]["failed"], 1);
}

#[tokio::test]
async fn test_peers_sorted_by_name() {
    let app = setup_admin_router(populated_state().await);
    let res = app.oneshot(get("/admin/peers", Some(KEY))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json(res).await;
    let peers = body.as_array().unwrap();
    assert_eq!(peers.len(), 2);
    assert_eq!(peers[0]["peer"]["name"], "node-a");
    assert_eq!(peers[0]["outcome"], "ok");
    assert_eq!(peers[0]["snapshot"]["cpus"], 4);
    assert_eq!(peers[1]["peer"]["name"], "node-b");
    assert_eq!(peers[1]["outcome"], "failed");
    assert_eq!(peers[1]["kind"], "connect_failed");
}

#[tokio::test]
async fn test_single_peer_lookup() {
    let app = setup_admin_router(populated_state().await);

    let res = app.clone().oneshot(get("/admin/peers/node-a", Some(KEY))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json(res).await["peer"]["addr"], "a");

    let res = app.oneshot(get("/admin/peers/node-z", Some(KEY))).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_degraded_on_directory_failure() {
    let state = state_after_cycle(Arc::new(BrokenDirectory), &CancellationToken::new()).await;
    let res = setup_admin_router(state).oneshot(get("/admin/status", Some(KEY))).await.unwrap();

    let body = json(res).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["last_cycle"]["cancelled"], false);
}

#[tokio::test]
async fn test_status_not_degraded_by_shutdown() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let directory = Arc::new(StaticDirectory::new(vec![Peer::new("node-a", "a")]));
    let state = state_after_cycle(directory, &cancel).await;
    let res = setup_admin_router(state).oneshot(get("/admin/status", Some(KEY))).await.unwrap();

    let body = json(res).await;
    assert_eq!(body["status"], "operational");
    assert_eq!(body["last_cycle"]["cancelled"], true);
}
