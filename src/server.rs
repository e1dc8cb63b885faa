//! HTTP binding of the bridge operations.
//!
//! Routes mirror what the browser userscript expects:
//!
//! | Method | Path           | Body                      |
//! |--------|----------------|---------------------------|
//! | GET    | `/status`      |                           |
//! | POST   | `/config/root` | `{ "path": ... }`         |
//! | POST   | `/sync`        | `{ "files": [...] }`      |
//! | POST   | `/rollback`    |                           |
//! | GET    | `/health`      |                           |
//!
//! Engine calls are synchronous file I/O and run on the blocking pool.

use crate::bridge::{Bridge, Status};
use crate::error::{BridgeError, Result};
use crate::steps::{FileRequest, FileResult, RollbackReport, SyncReport};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Request bodies up to 50 MiB; a batch carries whole files.
const BODY_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetRootRequest {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub files: Vec<FileRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub current_root: PathBuf,
    /// Same as `current_root`; the userscript reads this name.
    pub cwd: PathBuf,
    pub history: Vec<PathBuf>,
}

impl From<Status> for StatusResponse {
    fn from(status: Status) -> Self {
        Self {
            cwd: status.current_root.clone(),
            current_root: status.current_root,
            history: status.history,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRootResponse {
    pub success: bool,
    pub current_root: PathBuf,
    pub cwd: PathBuf,
    pub history: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub transaction_id: String,
    pub results: Vec<FileResult>,
}

impl From<SyncReport> for SyncResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            success: true,
            transaction_id: report.transaction_id.to_string(),
            results: report.results,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResponse {
    pub success: bool,
    pub restored_count: usize,
    pub transaction_id: String,
    pub warnings: Vec<String>,
}

impl From<RollbackReport> for RollbackResponse {
    fn from(report: RollbackReport) -> Self {
        Self {
            success: true,
            restored_count: report.restored_count,
            transaction_id: report.transaction_id.to_string(),
            warnings: report.warnings,
        }
    }
}

/// Whole-operation failure, rendered as `{ "success": false, "error": ... }`.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BridgeError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = serde_json::json!({
            "success": false,
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Creates the router over a shared bridge.
pub fn create_router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/config/root", post(handle_set_root))
        .route("/sync", post(handle_sync))
        .route("/rollback", post(handle_rollback))
        .route("/health", get(handle_health))
        .with_state(bridge)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
}

/// Binds and serves until Ctrl-C.
pub async fn run_server(bridge: Arc<Bridge>, config: ServerConfig) -> anyhow::Result<()> {
    let router = create_router(bridge);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Runs `op` on the blocking pool.
async fn blocking<T, F>(bridge: &Arc<Bridge>, op: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Bridge) -> Result<T> + Send + 'static,
{
    let bridge = Arc::clone(bridge);
    tokio::task::spawn_blocking(move || op(&bridge))
        .await
        .map_err(|e| ApiError(BridgeError::Other(e.into())))?
        .map_err(ApiError)
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_status(State(bridge): State<Arc<Bridge>>) -> Json<StatusResponse> {
    Json(bridge.status().into())
}

async fn handle_set_root(
    State(bridge): State<Arc<Bridge>>,
    payload: std::result::Result<Json<SetRootRequest>, JsonRejection>,
) -> std::result::Result<Json<SetRootResponse>, ApiError> {
    let Json(req) = payload?;
    let status = blocking(&bridge, move |b| {
        b.set_root(&req.path)?;
        Ok(b.status())
    })
    .await
    .inspect_err(|e| log::warn!("Root change rejected: {}", e.0))?;

    Ok(Json(SetRootResponse {
        success: true,
        cwd: status.current_root.clone(),
        current_root: status.current_root,
        history: status.history,
    }))
}

async fn handle_sync(
    State(bridge): State<Arc<Bridge>>,
    payload: std::result::Result<Json<SyncRequest>, JsonRejection>,
) -> std::result::Result<Json<SyncResponse>, ApiError> {
    let Json(req) = payload.inspect_err(|e| log::warn!("Rejected sync body: {}", e))?;
    let report = blocking(&bridge, move |b| b.sync(&req.files)).await?;
    Ok(Json(report.into()))
}

async fn handle_rollback(
    State(bridge): State<Arc<Bridge>>,
) -> std::result::Result<Json<RollbackResponse>, ApiError> {
    let report = blocking(&bridge, |b| b.rollback())
        .await
        .inspect_err(|e| log::error!("[Rollback Failed] {}", e.0))?;
    Ok(Json(report.into()))
}
