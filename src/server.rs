//! HTTP server.
//!
//! Exposes the retrieval service as a JSON API for the book-assistant
//! frontend. Every core call and every PDF extraction runs on tokio's
//! blocking pool, since embedding providers and `pdf-extract` block.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service status and corpus counts |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/upload` | Multipart upload, field `file` (PDF, `.txt`, `.md`) |
//! | `POST` | `/ask` | `{"question": "..."}` → answer with passages |
//! | `POST` | `/which-book` | `{"topic": "..."}` → mentions per book |
//! | `GET`  | `/books` | List loaded books |
//! | `POST` | `/clear` | Remove every book |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "No question provided" } }
//! ```
//!
//! Error codes: `bad_request` (400), `no_corpus` (400),
//! `payload_too_large` (413), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser frontend on
//! another origin can call the API.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bookrag_core::{ErrorKind, RetrievalError, RetrievalService};

use crate::config::{build_service, Config};
use crate::extract::{extract_text, resolve_content_type, ExtractError};

#[derive(Clone)]
struct AppState {
    service: Arc<RetrievalService>,
}

/// Starts the HTTP server with an empty service built from `config`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = build_service(config)?;
    run_server_with_service(config, Arc::new(service)).await
}

/// Starts the HTTP server around an existing service.
pub async fn run_server_with_service(
    config: &Config,
    service: Arc<RetrievalService>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(service, config.server.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "bookrag server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with all routes, CORS, request tracing and the upload
/// size limit.
pub fn build_router(service: Arc<RetrievalService>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_status))
        .route("/health", get(handle_health))
        .route("/upload", post(handle_upload))
        .route("/ask", post(handle_ask))
        .route("/which-book", post(handle_which_book))
        .route("/books", get(handle_books))
        .route("/clear", post(handle_clear))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
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

fn payload_too_large(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::PAYLOAD_TOO_LARGE,
        code: "payload_too_large",
        message: message.into(),
    }
}

/// Logs the cause and returns a generic 500.
fn internal(cause: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %cause, "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: "Internal server error".to_string(),
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        match err.kind() {
            ErrorKind::Input => bad_request(err.to_string()),
            ErrorKind::EmptyCorpus => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "no_corpus",
                message: err.to_string(),
            },
            ErrorKind::Unexpected => internal(format!("{:#}", anyhow::Error::from(err))),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedContentType(_) => bad_request(err.to_string()),
            ExtractError::Pdf(_) => internal(err),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            payload_too_large("File too large")
        } else {
            bad_request(err.body_text())
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(err: MultipartRejection) -> Self {
        tracing::debug!(reason = %err.body_text(), "upload is not multipart");
        bad_request("No file provided")
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        bad_request(err.body_text())
    }
}

/// Run a blocking core call on tokio's blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(internal)?
}

/// Successful responses carry `"success": true` next to the payload.
#[derive(Serialize)]
struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

fn success<T: Serialize>(body: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        body,
    })
}

// ============ GET / and /health ============

async fn handle_status(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let service = state.service.clone();
    let status = blocking(move || Ok(service.status())).await?;
    Ok(Json(status))
}

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

// ============ POST /upload ============

async fn handle_upload(
    State(state): State<AppState>,
    payload: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut multipart = payload?;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some((file_name, declared, bytes));
        break;
    }

    let (file_name, declared, bytes) = upload.ok_or_else(|| bad_request("No file provided"))?;
    if file_name.trim().is_empty() {
        return Err(RetrievalError::MissingFileName.into());
    }

    let content_type = resolve_content_type(declared.as_deref(), &file_name);
    tracing::debug!(file = %file_name, %content_type, bytes = bytes.len(), "upload received");

    let service = state.service.clone();
    let receipt = blocking(move || {
        let text = extract_text(&bytes, &content_type)?;
        Ok(service.upload(&file_name, &text)?)
    })
    .await?;

    Ok(success(receipt))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let service = state.service.clone();
    let answer = blocking(move || Ok(service.ask(&request.question)?)).await?;
    Ok(success(answer))
}

// ============ POST /which-book ============

#[derive(Deserialize)]
struct TopicRequest {
    #[serde(default)]
    topic: String,
}

async fn handle_which_book(
    State(state): State<AppState>,
    payload: Result<Json<TopicRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let service = state.service.clone();
    let report = blocking(move || Ok(service.which_books(&request.topic)?)).await?;
    Ok(success(report))
}

// ============ GET /books ============

async fn handle_books(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let service = state.service.clone();
    let library = blocking(move || Ok(service.list_books())).await?;
    Ok(success(library))
}

// ============ POST /clear ============

#[derive(Serialize)]
struct ClearResponse {
    message: String,
}

async fn handle_clear(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let service = state.service.clone();
    blocking(move || {
        service.clear();
        Ok(())
    })
    .await?;
    Ok(success(ClearResponse {
        message: "All books cleared".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_map_to_bad_request() {
        let err: AppError = RetrievalError::EmptyQuery.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
        assert_eq!(err.message, "No question provided");
    }

    #[test]
    fn test_no_corpus_has_its_own_code() {
        let err: AppError = RetrievalError::NoCorpus.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "no_corpus");
    }

    #[test]
    fn test_unexpected_errors_are_generic() {
        let err: AppError = RetrievalError::Embedding(anyhow::anyhow!("secret detail")).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "internal");
        assert!(!err.message.contains("secret"));
    }

    #[test]
    fn test_extract_errors() {
        let err: AppError = ExtractError::UnsupportedContentType("image/png".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err: AppError = ExtractError::Pdf("broken xref".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_success_flattens_payload() {
        let Json(body) = success(ClearResponse {
            message: "done".to_string(),
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "message": "done" }));
    }
}
