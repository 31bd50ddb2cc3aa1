//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::Instant;

use peer_heartbeat::health::{HealthSnapshot, PeerHealthResult, PollCycle};
use peer_heartbeat::observability::HealthSink;
use peer_heartbeat::peer::DirectoryError;
use peer_heartbeat::transport::{ConnectError, HealthClientFactory, HealthSession, QueryError};

// ---------------------------------------------------------------------------
// Loopback peer agents
// ---------------------------------------------------------------------------

/// Start a peer agent that answers every request with the given snapshot.
pub async fn start_mock_peer(snapshot: HealthSnapshot) -> SocketAddr {
    let body = serde_json::to_string(&snapshot).unwrap();
    start_programmable_peer(move || {
        let body = body.clone();
        async move { (200, body) }
    })
    .await
}

/// Start a peer agent whose response is computed per request.
pub async fn start_programmable_peer<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 2048];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a peer that accepts connections but never answers.
pub async fn start_silent_peer() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address with nothing listening on it.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

/// How a scripted peer behaves.
#[derive(Debug, Clone)]
pub enum Script {
    Healthy(HealthSnapshot),
    /// Answer after a delay.
    Slow(Duration, HealthSnapshot),
    ConnectRefused,
    /// Connect never completes.
    ConnectHang,
    /// The factory panics while opening the session.
    ConnectPanic,
    QueryError,
    /// Query never completes.
    QueryHang,
    /// The session panics while querying.
    QueryPanic,
}

/// Transport driven by a per-address script, counting sessions.
#[derive(Default)]
pub struct ScriptedFactory {
    scripts: HashMap<String, Script>,
    opened: Arc<Mutex<HashMap<String, usize>>>,
    closed: Arc<Mutex<HashMap<String, usize>>>,
    open_calls: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, addr: &str, script: Script) -> Self {
        self.scripts.insert(addr.to_string(), script);
        self
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn opened(&self, addr: &str) -> usize {
        self.opened.lock().unwrap().get(addr).copied().unwrap_or(0)
    }

    pub fn closed(&self, addr: &str) -> usize {
        self.closed.lock().unwrap().get(addr).copied().unwrap_or(0)
    }

    pub fn total_opened(&self) -> usize {
        self.opened.lock().unwrap().values().sum()
    }

    pub fn total_closed(&self) -> usize {
        self.closed.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl HealthClientFactory for ScriptedFactory {
    async fn open(&self, addr: &str) -> Result<Box<dyn HealthSession>, ConnectError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .get(addr)
            .cloned()
            .unwrap_or(Script::Healthy(HealthSnapshot::default()));

        match script {
            Script::ConnectRefused => {
                return Err(ConnectError::Io {
                    addr: addr.to_string(),
                    message: "connection refused".into(),
                })
            }
            Script::ConnectHang => std::future::pending::<()>().await,
            Script::ConnectPanic => panic!("resolver blew up for {}", addr),
            _ => {}
        }

        *self.opened.lock().unwrap().entry(addr.to_string()).or_default() += 1;
        Ok(Box::new(ScriptedSession {
            addr: addr.to_string(),
            script,
            closed: self.closed.clone(),
        }))
    }
}

struct ScriptedSession {
    addr: String,
    script: Script,
    closed: Arc<Mutex<HashMap<String, usize>>>,
}

#[async_trait]
impl HealthSession for ScriptedSession {
    async fn query_health(&mut self, _deadline: Instant) -> Result<HealthSnapshot, QueryError> {
        match &self.script {
            Script::Healthy(snapshot) => Ok(snapshot.clone()),
            Script::Slow(delay, snapshot) => {
                tokio::time::sleep(*delay).await;
                Ok(snapshot.clone())
            }
            Script::QueryError => Err(QueryError::Rpc("stream reset by peer".into())),
            Script::QueryHang => std::future::pending().await,
            Script::QueryPanic => panic!("health decoder exploded"),
            Script::ConnectRefused | Script::ConnectHang | Script::ConnectPanic => unreachable!("no session for {}", self.addr),
        }
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        *self.closed.lock().unwrap().entry(self.addr.clone()).or_default() += 1;
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Records everything it is given, in order.
#[derive(Default)]
pub struct CollectingSink {
    pub results: Mutex<Vec<PeerHealthResult>>,
    pub directory_failures: Mutex<Vec<String>>,
    pub cycles: AtomicUsize,
}

impl CollectingSink {
    pub fn results(&self) -> Vec<PeerHealthResult> {
        self.results.lock().unwrap().clone()
    }

    pub fn directory_failures(&self) -> Vec<String> {
        self.directory_failures.lock().unwrap().clone()
    }
}

impl HealthSink for CollectingSink {
    fn record(&self, result: &PeerHealthResult) {
        self.results.lock().unwrap().push(result.clone());
    }

    fn record_directory_failure(&self, error: &DirectoryError) {
        self.directory_failures.lock().unwrap().push(error.to_string());
    }

    fn cycle_completed(&self, _cycle: &PollCycle) {
        self.cycles.fetch_add(1, Ordering::SeqCst);
    }
}
