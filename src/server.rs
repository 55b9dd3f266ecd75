//! HTTP server.
//!
//! Exposes context aggregation, Drive ingestion, and semantic query as a
//! JSON API for the site's chat front-end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/context?query=` | Aggregated, relevance-filtered context |
//! | `POST` | `/api/ingest` | Ingest a Drive folder into the vector index |
//! | `POST` | `/api/query` | Nearest-neighbour search over ingested chunks |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "success": false, "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `configuration_missing` (400 when the
//! caller must supply the missing value, 500 when the server is
//! misconfigured), `upstream_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::aggregate::ContextResponse;
use crate::app::App;
use crate::config::Config;
use crate::drive::{DriveClient, FileFilter};
use crate::error::ContextError;
use crate::models::Match;
use crate::progress::NoProgress;

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = Arc::new(App::from_config(config)?);
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(
        addr = %bind_addr,
        model = app.embedder.model_name(),
        namespace = %config.index.namespace,
        "server listening"
    );
    axum::serve(listener, router(app)).await?;

    Ok(())
}

/// Build the router over an already-wired [`App`].
pub fn router(app: Arc<App>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/context", get(handle_context))
        .route("/api/ingest", post(handle_ingest))
        .route("/api/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

/// A value the caller could have supplied is missing.
fn missing_from_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "configuration_missing",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<ContextError> for AppError {
    fn from(err: ContextError) -> Self {
        let message = err.to_string();
        match err {
            ContextError::InvalidRequest(_) => bad_request(message),
            // Server-side credentials; the caller cannot fix these.
            ContextError::ConfigurationMissing(_) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "configuration_missing",
                message,
            },
            e if e.is_upstream() => {
                error!(error = %message, "upstream failure");
                AppError {
                    status: StatusCode::BAD_GATEWAY,
                    code: "upstream_error",
                    message,
                }
            }
            _ => internal(message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/context ============

#[derive(Deserialize)]
struct ContextParams {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct ContextBody {
    success: bool,
    #[serde(flatten)]
    response: ContextResponse,
}

/// Never fails: unavailable sources show up as empty sections.
async fn handle_context(
    State(app): State<Arc<App>>,
    Query(params): Query<ContextParams>,
) -> Json<ContextBody> {
    let response = app.aggregator.context_for(&params.query).await;
    Json(ContextBody {
        success: true,
        response,
    })
}

// ============ POST /api/ingest ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestRequest {
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    success: bool,
    message: String,
    files_processed: usize,
    chunks_created: usize,
    chunks_failed: usize,
    failed_batches: usize,
}

async fn handle_ingest(
    State(app): State<Arc<App>>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, AppError> {
    let Json(req) = body?;
    let drive = &app.config.drive;

    let folder_id = req
        .folder_id
        .filter(|f| !f.trim().is_empty())
        .or_else(|| drive.folder_id.clone())
        .ok_or_else(|| missing_from_request("folderId is required"))?;

    // Server-side misconfiguration is reported before Drive is touched.
    let ingestor = app.ingestor().map_err(|e| internal(format!("{:#}", e)))?;
    ingestor.ensure_ready()?;

    let client = DriveClient::from_config(drive, req.access_token.as_deref()).map_err(|e| match e {
        ContextError::ConfigurationMissing(m) => missing_from_request(m),
        other => AppError::from(other),
    })?;
    let filter = FileFilter::from_config(drive)?;

    let report = ingestor
        .ingest_drive(&client, Some(&folder_id), &filter, &NoProgress)
        .await?;

    let message = if report.failed_batches == 0 {
        format!(
            "Ingested {} chunks from {} files",
            report.chunks_created, report.documents_processed
        )
    } else {
        format!(
            "Ingested {} chunks from {} files; {} of {} batches failed",
            report.chunks_created, report.documents_processed, report.failed_batches, report.batches
        )
    };

    Ok(Json(IngestResponse {
        success: report.failed_batches == 0,
        message,
        files_processed: report.documents_processed,
        chunks_created: report.chunks_created,
        chunks_failed: report.chunks_failed,
        failed_batches: report.failed_batches,
    }))
}

// ============ POST /api/query ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct QueryResponse {
    success: bool,
    query: String,
    results: Vec<Match>,
    count: usize,
}

async fn handle_query(
    State(app): State<Arc<App>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(req) = body?;
    let results = app.query.query(&req.query, req.top_k).await?;

    Ok(Json(QueryResponse {
        success: true,
        count: results.len(),
        query: req.query,
        results,
    }))
}
