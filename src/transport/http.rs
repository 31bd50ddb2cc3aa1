//! HTTP/1.1 health transport.
//!
//! # Responsibilities
//! - Open one TCP connection per session, bounded by the connect timeout
//! - Send `GET <health_path>` and decode the JSON snapshot
//! - Close the connection when the session is dropped
//!
//! # Design Decisions
//! - Uses hyper's connection-level client instead of a pooled client so the
//!   session owns exactly one connection
//! - Response bodies are capped; a health snapshot is a few hundred bytes

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::PollerConfig;
use crate::health::snapshot::HealthSnapshot;
use crate::transport::{ConnectError, HealthClientFactory, HealthSession, QueryError};

const USER_AGENT: &str = concat!("peer-heartbeat/", env!("CARGO_PKG_VERSION"));

/// Largest accepted health payload.
const MAX_HEALTH_BODY: usize = 64 * 1024;

/// Opens HTTP sessions to peer agents.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    health_path: String,
    connect_timeout: Duration,
}

impl HttpClientFactory {
    pub fn new(health_path: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            health_path: health_path.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &PollerConfig) -> Self {
        Self::new(
            config.health_path.clone(),
            Duration::from_millis(config.connect_timeout_ms),
        )
    }
}

#[async_trait]
impl HealthClientFactory for HttpClientFactory {
    async fn open(&self, addr: &str) -> Result<Box<dyn HealthSession>, ConnectError> {
        let stream = match time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ConnectError::Io {
                    addr: addr.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ConnectError::Timeout {
                    addr: addr.to_string(),
                    timeout_ms: self.connect_timeout.as_millis() as u64,
                })
            }
        };
        let _ = stream.set_nodelay(true);

        let (sender, connection) = http1::handshake::<_, Body>(TokioIo::new(stream))
            .await
            .map_err(|e| ConnectError::Handshake {
                addr: addr.to_string(),
                message: e.to_string(),
            })?;

        let conn_addr = addr.to_string();
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(addr = %conn_addr, error = %e, "Peer connection ended with error");
            }
        });

        tracing::trace!(addr = %addr, "Session opened");

        Ok(Box::new(HttpSession {
            addr: addr.to_string(),
            path: self.health_path.clone(),
            sender,
            connection,
        }))
    }
}

/// A single HTTP connection to a peer agent.
pub struct HttpSession {
    addr: String,
    path: String,
    sender: http1::SendRequest<Body>,
    connection: JoinHandle<()>,
}

impl HttpSession {
    async fn exchange(&mut self) -> Result<HealthSnapshot, QueryError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.path.as_str())
            .header(header::HOST, self.addr.as_str())
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .map_err(|e| QueryError::Rpc(e.to_string()))?;

        self.sender
            .ready()
            .await
            .map_err(|e| QueryError::Rpc(e.to_string()))?;

        let response = self
            .sender
            .send_request(request)
            .await
            .map_err(|e| QueryError::Rpc(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_HEALTH_BODY)
            .await
            .map_err(|e| QueryError::Rpc(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| QueryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HealthSession for HttpSession {
    async fn query_health(&mut self, deadline: Instant) -> Result<HealthSnapshot, QueryError> {
        match time::timeout_at(deadline, self.exchange()).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout),
        }
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        self.connection.abort();
        tracing::trace!(addr = %self.addr, "Session closed");
    }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("addr", &self.addr)
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        addr
    }

    fn factory() -> HttpClientFactory {
        HttpClientFactory::new("/v1/health", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_query_decodes_snapshot() {
        let addr = serve_once("200 OK", r#"{"os_name":"linux","cpus":4,"memory_total":8192}"#).await;

        let mut session = factory().open(&addr).await.unwrap();
        let snapshot = session
            .query_health(Instant::now() + Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(snapshot.os_name, "linux");
        assert_eq!(snapshot.cpus, 4);
        assert_eq!(snapshot.memory_total, 8192);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let addr = serve_once("503 Service Unavailable", "{}").await;

        let mut session = factory().open(&addr).await.unwrap();
        let err = session
            .query_health(Instant::now() + Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Status(503)));
    }

    #[tokio::test]
    async fn test_undecodable_payload() {
        let addr = serve_once("200 OK", "not json").await;

        let mut session = factory().open(&addr).await.unwrap();
        let err = session
            .query_health(Instant::now() + Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Decode(_)));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        match factory().open(&addr).await {
            Err(err) => assert!(matches!(err, ConnectError::Io { .. }), "unexpected error: {}", err),
            Ok(_) => panic!("refused port must not connect"),
        }
    }

    #[tokio::test]
    async fn test_query_deadline() {
        // Accepts but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let mut session = factory().open(&addr).await.unwrap();
        let err = session
            .query_health(Instant::now() + Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Timeout));
    }
}
