//! IPC server: an axum router bound to a Unix socket.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::info;

use ctbot_config::AppConfig;

use super::types::*;
use crate::build_info;
use crate::daemon::ShutdownSignal;
use crate::stats::DaemonStats;

/// State shared by the route handlers.
pub struct IpcState {
    pub config: AppConfig,
    pub shutdown_tx: broadcast::Sender<ShutdownSignal>,
    pub stats: Arc<DaemonStats>,
    pub doc_terms: usize,
    pub mapping_entries: Option<usize>,
    pub started_at: Instant,
}

pub fn router(state: Arc<IpcState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/stop", post(handle_stop))
        .with_state(state)
}

/// Serve IPC on `socket_path` until shutdown.
///
/// A stale socket file from a previous run is removed before binding and the
/// socket is removed again on exit.
pub async fn serve(
    socket_path: &Path,
    state: Arc<IpcState>,
    mut shutdown_rx: broadcast::Receiver<ShutdownSignal>,
) -> Result<(), std::io::Error> {
    if socket_path.exists() {
        tokio::fs::remove_file(socket_path).await?;
    }
    if let Some(parent) = socket_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let listener = UnixListener::bind(socket_path)?;
    info!(path = %socket_path.display(), "IPC server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("IPC server shutting down");
        })
        .await?;

    tokio::fs::remove_file(socket_path).await.ok();
    Ok(())
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: build_info::version_string(),
        git_hash: build_info::GIT_HASH.to_string(),
        build_profile: build_info::BUILD_PROFILE.to_string(),
    })
}

async fn handle_status(State(state): State<Arc<IpcState>>) -> Json<StatusResponse> {
    let config = &state.config;
    Json(StatusResponse {
        running: true,
        version: build_info::VERSION.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        pid: std::process::id(),
        command_prefix: config.commands.prefix.clone(),
        stream_enabled: config.stream.enabled,
        stream_url: config.stream.url.clone(),
        notify_sink: config.notify.sink.clone(),
        doc_terms: state.doc_terms,
        mapping_entries: state.mapping_entries,
        stats: state.stats.snapshot(),
    })
}

async fn handle_stop(State(state): State<Arc<IpcState>>) -> (StatusCode, Json<StopResponse>) {
    info!("Stop requested via IPC");
    let _ = state.shutdown_tx.send(ShutdownSignal);
    (
        StatusCode::OK,
        Json(StopResponse {
            acknowledged: true,
            message: "Shutdown initiated".to_string(),
        }),
    )
}
