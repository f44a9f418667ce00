//! HTTP upload server for exsheet.
//!
//! Provides the upload endpoint that accepts a Word document and responds
//! with the encoded explanations workbook as a downloadable attachment,
//! plus a browser upload form and a health probe.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use exsheet_core::{ExtractionPipeline, MarkupSource, WorkbookEncoder};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Download name offered for every produced workbook.
pub const ATTACHMENT_FILENAME: &str = "explanations.xlsx";

/// Content type of the produced workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const UPLOAD_FORM: &str = r#"
    <h2>Upload a Word file</h2>
    <form enctype="multipart/form-data" action="/upload" method="POST">
      <input type="file" name="file" />
      <button type="submit">Upload</button>
    </form>
"#;

/// Configuration for the upload HTTP server.
#[derive(Debug, Clone)]
pub struct ExtractServerConfig {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub upload_dir: PathBuf,
}

impl ExtractServerConfig {
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            max_body_bytes: 25 * 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            upload_dir: PathBuf::from("uploads"),
        }
    }

    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn with_upload_dir(mut self, upload_dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = upload_dir.into();
        self
    }
}

impl Default for ExtractServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:4030".parse().expect("valid default address"))
    }
}

/// HTTP upload server wrapper.
pub struct ExtractServer<S, E> {
    config: ExtractServerConfig,
    state: AppState<S, E>,
}

impl<S, E> ExtractServer<S, E>
where
    S: MarkupSource + Send + Sync + 'static,
    E: WorkbookEncoder + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(pipeline: Arc<ExtractionPipeline<S, E>>, config: ExtractServerConfig) -> Self {
        let state = AppState {
            pipeline,
            request_timeout: config.request_timeout,
            upload_dir: config.upload_dir.clone(),
        };
        Self { config, state }
    }

    /// Runs the HTTP server until shutdown.
    ///
    /// # Errors
    /// Returns any listener or server error, or a failure to create the
    /// upload directory.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.addr;
        tokio::fs::create_dir_all(&self.state.upload_dir).await?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = build_router(self.state, self.config.max_body_bytes);

        info!("exsheet-ingest listening on {addr}");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

struct AppState<S, E> {
    pipeline: Arc<ExtractionPipeline<S, E>>,
    request_timeout: Duration,
    upload_dir: PathBuf,
}

impl<S, E> Clone for AppState<S, E> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            request_timeout: self.request_timeout,
            upload_dir: self.upload_dir.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn timeout() -> Self {
        Self {
            status: StatusCode::REQUEST_TIMEOUT,
            message: "extraction request timed out".to_string(),
        }
    }

    // Collaborator failure detail stays in the server log.
    fn processing() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "failed to process the document".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

fn build_router<S, E>(state: AppState<S, E>, max_body_bytes: usize) -> Router
where
    S: MarkupSource + Send + Sync + 'static,
    E: WorkbookEncoder + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(upload_form))
        .route("/health", get(health))
        .route("/upload", post(upload::<S, E>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

async fn upload<S, E>(
    State(state): State<AppState<S, E>>,
    multipart: Multipart,
) -> Result<Response, ApiError>
where
    S: MarkupSource + Send + Sync + 'static,
    E: WorkbookEncoder + Send + Sync + 'static,
{
    let payload = read_file_field(multipart).await?;

    let temp_path = state.upload_dir.join(format!("{}.docx", Uuid::new_v4()));
    if let Err(err) = tokio::fs::write(&temp_path, &payload).await {
        error!("failed to store upload at {}: {err}", temp_path.display());
        return Err(ApiError::processing());
    }

    let pipeline = state.pipeline.clone();
    let run_path = temp_path.clone();
    let outcome = tokio::time::timeout(
        state.request_timeout,
        tokio::task::spawn_blocking(move || pipeline.run_file(&run_path)),
    )
    .await;

    if let Err(err) = tokio::fs::remove_file(&temp_path).await {
        warn!("failed to remove upload at {}: {err}", temp_path.display());
    }

    let output = match outcome {
        Err(_) => return Err(ApiError::timeout()),
        Ok(Err(join_err)) => {
            error!("extraction task failed: {join_err}");
            return Err(ApiError::processing());
        }
        Ok(Ok(Err(pipeline_err))) => {
            error!("document processing failed: {pipeline_err}");
            return Err(ApiError::processing());
        }
        Ok(Ok(Ok(output))) => output,
    };

    info!(
        fragment_count = output.fragment_count,
        "produced explanations workbook"
    );

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{ATTACHMENT_FILENAME}\""),
        ),
    ];
    Ok((headers, output.workbook).into_response())
}

async fn read_file_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::bad_request(format!("unreadable multipart payload: {err}")))?;
        let Some(field) = field else {
            return Err(ApiError::bad_request("multipart field `file` is required"));
        };
        if field.name() != Some("file") {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(format!("unreadable file field: {err}")))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("file field is empty"));
        }
        return Ok(bytes.to_vec());
    }
}
