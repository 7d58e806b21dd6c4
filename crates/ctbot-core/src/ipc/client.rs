//! IPC client: HTTP/1.1 over the daemon's Unix socket, via `hyper`.

use std::path::PathBuf;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use tokio::net::UnixStream;
use tracing::{debug, warn};

use super::types::*;

#[derive(Debug, thiserror::Error)]
pub enum IpcClientError {
    #[error("failed to connect to daemon socket at {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("daemon is not running (socket not found at {0})")]
    NotRunning(PathBuf),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to parse {route} response: {source}")]
    Parse {
        route: &'static str,
        source: serde_json::Error,
    },

    #[error("daemon returned error: {0}")]
    Daemon(String),
}

pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Whether the socket file exists (the daemon is probably running).
    pub fn daemon_available(&self) -> bool {
        self.socket_path.exists()
    }

    async fn request(&self, method: hyper::Method, route: &'static str) -> Result<Bytes, IpcClientError> {
        if !self.daemon_available() {
            return Err(IpcClientError::NotRunning(self.socket_path.clone()));
        }

        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| IpcClientError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
            .await
            .map_err(|e| IpcClientError::Request(format!("HTTP handshake failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!(error = %e, "IPC connection error");
            }
        });

        debug!(%method, route, "IPC request");

        let req = hyper::Request::builder()
            .method(method)
            .uri(route)
            .header("host", "localhost")
            .body(Full::new(Bytes::new()))
            .map_err(|e| IpcClientError::Request(format!("failed to build request: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| IpcClientError::Request(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| IpcClientError::Request(format!("failed to read response body: {e}")))?
            .to_bytes();

        if !status.is_success() {
            if let Ok(err) = serde_json::from_slice::<ErrorResponse>(&body) {
                return Err(IpcClientError::Daemon(err.error));
            }
            return Err(IpcClientError::Request(format!("unexpected status: {status}")));
        }
        Ok(body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: hyper::Method,
        route: &'static str,
    ) -> Result<T, IpcClientError> {
        let body = self.request(method, route).await?;
        serde_json::from_slice(&body).map_err(|source| IpcClientError::Parse { route, source })
    }

    pub async fn health(&self) -> Result<HealthResponse, IpcClientError> {
        self.call(hyper::Method::GET, "/health").await
    }

    pub async fn status(&self) -> Result<StatusResponse, IpcClientError> {
        self.call(hyper::Method::GET, "/status").await
    }

    /// Ask the daemon to shut down.
    pub async fn stop(&self) -> Result<StopResponse, IpcClientError> {
        self.call(hyper::Method::POST, "/stop").await
    }
}
