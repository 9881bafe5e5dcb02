//! HTTP surface for `tdx serve`.
//!
//! | Method     | Path       | Response                                         |
//! |------------|------------|--------------------------------------------------|
//! | `GET`      | `/`        | plain-text liveness message                      |
//! | `GET`      | `/index`   | the persisted manifest, or 404                   |
//! | `GET/POST` | `/reindex` | `{ok, stats, generatedAt}` after a fresh run     |
//! | `GET`      | `/health`  | `{ok, ts}`                                       |
//!
//! Scans run on tokio's blocking pool. An async mutex serializes them so two
//! reindex requests never write the manifest at the same time. The guard is
//! owned by the blocking task, so a client that disconnects mid-scan does not
//! release the lock before the scan finishes.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use camino::Utf8PathBuf;
use serde::Serialize;
use tdx_core::{Manifest, ManifestStats, ServeConfig};
use tdx_scanner::{ScanError, ScanSummary, Scanner};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared state behind every route.
#[derive(Debug)]
pub struct AppState {
    scanner: Scanner,
    output_path: Utf8PathBuf,
    scan_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Wraps a scanner; the manifest location comes from its configuration.
    pub fn new(scanner: Scanner) -> Self {
        let output_path = scanner.config().output_path.clone();
        Self {
            scanner,
            output_path,
            scan_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs one scan-and-persist cycle, waiting for any cycle in progress.
    async fn reindex(&self) -> Result<ReindexResponse, ApiError> {
        let (manifest, _) = self
            .start_scan()
            .await
            .await
            .map_err(|err| ApiError::internal(format!("scan task failed: {err}")))?
            .map_err(|err| {
                if let Some(path) = err.path() {
                    warn!(path = %path, "Manifest not written");
                }
                ApiError::internal(err.to_string())
            })?;

        Ok(ReindexResponse {
            ok: true,
            stats: manifest.stats,
            generated_at: tdx_core::timestamp::format(&manifest.generated_at),
        })
    }

    /// Waits for the scan lock, then starts a scan that holds it until done.
    async fn start_scan(&self) -> JoinHandle<Result<(Manifest, ScanSummary), ScanError>> {
        let guard = Arc::clone(&self.scan_lock).lock_owned().await;
        let scanner = self.scanner.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            scanner.run()
        })
    }
}

/// Body of a successful `/reindex`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReindexResponse {
    ok: bool,
    stats: ManifestStats,
    generated_at: String,
}

/// Body of `/health`.
#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    ts: i64,
}

/// A JSON error reply: `{"ok": false, "error": "..."}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            ok: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Builds the router with permissive CORS.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/index", get(index))
        .route("/reindex", get(reindex).post(reindex))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
}

/// Binds the configured address and serves until Ctrl-C or SIGTERM.
///
/// When `scan_on_start` is set, one scan runs in the background right away;
/// its failure is logged and the server keeps running.
pub async fn serve(scanner: Scanner, config: &ServeConfig) -> color_eyre::Result<()> {
    let state = Arc::new(AppState::new(scanner));

    if config.scan_on_start {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            match state.reindex().await {
                Ok(done) => info!(
                    indexed = done.stats.indexed,
                    reused = done.stats.reused,
                    failed = done.stats.failed,
                    "Initial scan completed"
                ),
                Err(err) => warn!(error = %err.message, "Initial scan failed"),
            }
        });
    }

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c => {}
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(err) => {
                warn!(error = %err, "Cannot listen for SIGTERM");
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn root() -> &'static str {
    "textdex is running. GET /index for the manifest, POST /reindex to rebuild it."
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    match tokio::fs::read(&state.output_path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ApiError::not_found(
            "index not found; POST /reindex to build it",
        )),
        Err(err) => Err(ApiError::internal(format!(
            "cannot read {}: {err}",
            state.output_path
        ))),
    }
}

async fn reindex(State(state): State<Arc<AppState>>) -> Response {
    match state.reindex().await {
        Ok(done) => Json(done).into_response(),
        Err(err) => {
            warn!(error = %err.message, "Reindex failed");
            err.into_response()
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        ts: chrono::Utc::now().timestamp_millis(),
    })
}
