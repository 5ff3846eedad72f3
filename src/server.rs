//! HTTP boundary: upload endpoint, health check, static frontend.
//!
//! Thin glue over [`crate::extract::extract_batch`]. Uploaded files are
//! spooled into a per-request [`tempfile::TempDir`]; dropping it removes the
//! directory on every exit path, success or failure, so no batch leaves
//! residue on disk.

use crate::config::ExtractionConfig;
use crate::error::W9Error;
use crate::extract::extract_batch;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Uploads are capped at 25 MiB per request; scanned single-page forms are
/// far smaller.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state threaded into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ExtractionConfig>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    service: &'static str,
}

/// Per-file entry of the extraction response.
#[derive(Serialize)]
struct FileResult {
    filename: String,
    data: serde_json::Value,
    success: bool,
}

/// Envelope returned by `POST /api/extract`.
#[derive(Serialize)]
struct ExtractResponse {
    results: Vec<FileResult>,
    success: bool,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler-level failures; per-document failures never reach this type.
enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "w9-extract",
    })
}

fn is_pdf_filename(name: &str) -> bool {
    name.to_lowercase().ends_with(".pdf")
}

static RE_UNSAFE_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// Strip path components and shell-hostile characters from an upload name.
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string());
    RE_UNSAFE_FILENAME.replace_all(&base, "_").into_owned()
}

/// `POST /api/extract` — accept multiple PDF uploads and run the pipeline.
async fn extract_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    // The TempDir owns every spooled upload; dropping it (any return path)
    // removes the directory and its contents.
    let upload_dir = tempfile::tempdir()
        .map_err(|e| AppError::Internal(format!("could not create upload directory: {e}")))?;

    let mut saved: Vec<PathBuf> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("unreadable multipart field: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        if !is_pdf_filename(&filename) {
            return Err(AppError::BadRequest(format!(
                "File {filename} is not a PDF. Only PDF files are accepted."
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("unreadable upload {filename}: {e}")))?;

        let path = upload_dir.path().join(sanitize_filename(&filename));
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| AppError::Internal(format!("could not spool {filename}: {e}")))?;
        saved.push(path);
    }

    if saved.is_empty() {
        return Err(AppError::BadRequest("No files provided".to_string()));
    }

    info!("processing {} uploaded file(s)", saved.len());
    let outcomes = extract_batch(&saved, &state.config)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let results: Vec<FileResult> = outcomes
        .into_iter()
        .map(|outcome| {
            let filename = Path::new(&outcome.file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(outcome.file.clone());
            let success = outcome.response.is_success();
            let data = serde_json::to_value(&outcome.response)
                .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }));
            FileResult { filename, data, success }
        })
        .collect();

    let message = format!("Successfully processed {} files", results.len());
    Ok(Json(ExtractResponse { results, success: true, message }))
}

/// Build the application router.
///
/// `frontend_dir`, when it exists, is served at the root with an
/// `index.html` fallback so client-side routes resolve.
pub fn router(state: AppState, frontend_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/extract", post(extract_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state);

    if let Some(dir) = frontend_dir.filter(|d| d.is_dir()) {
        info!("serving frontend from {}", dir.display());
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    app.layer(TraceLayer::new_for_http()).layer(cors)
}

/// Bind and serve until SIGINT/SIGTERM.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    frontend_dir: Option<&Path>,
) -> Result<(), W9Error> {
    let app = router(state, frontend_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("w9-extract listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
