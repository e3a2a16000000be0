//! HTTP API server.
//!
//! Exposes the restaurant agent, the streaming services (poem, recruiter
//! chat, CV evaluation), presentation outlines, and the menu.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::MuseError;
use crate::media::Artifact;
use crate::orchestrator::Orchestrator;
use crate::services::{default_criteria, ChatTurn, CvEvaluationRequest, Slide};
use crate::stream::{StreamingEmitter, NDJSON_CONTENT_TYPE};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Largest accepted request body (image uploads).
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState { orchestrator });
    let app = router(state.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Muse API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Agent", "POST /invoke (multipart)");
    Output::kv("Poem", "POST /stream");
    Output::kv("Recruiter chat", "POST /cv/stream");
    Output::kv("Evaluate CV", "POST /evaluate-cv");
    Output::kv("Default criteria", "GET  /default-criteria");
    Output::kv("Outline", "POST /generate-outline");
    Output::kv("Enrich outline", "POST /enrich-outline");
    Output::kv("Menu", "GET  /menu");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down");
    state.orchestrator.shutdown();
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/invoke", post(invoke))
        .route("/stream", post(poem_stream))
        .route("/cv/stream", post(recruiter_stream))
        .route("/evaluate-cv", post(evaluate_cv))
        .route("/default-criteria", get(get_default_criteria))
        .route("/generate-outline", post(generate_outline))
        .route("/enrich-outline", post(enrich_outline))
        .route("/menu", get(list_menu))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Serialize)]
struct InvokeResponse {
    response: String,
    thread_id: String,
    artifacts: Vec<Artifact>,
}

#[derive(Deserialize)]
struct MessageRequest {
    input: Vec<ChatTurn>,
}

#[derive(Deserialize)]
struct OutlineRequest {
    topic: String,
    #[serde(default)]
    source_text: String,
}

#[derive(Deserialize, Serialize)]
struct OutlineBody {
    outline: Vec<Slide>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Maps library errors onto HTTP statuses.
struct ApiError(MuseError);

impl From<MuseError> for ApiError {
    fn from(e: MuseError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MuseError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Removes an uploaded file once the request is done with it.
struct UploadGuard(PathBuf);

impl Drop for UploadGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            debug!("Could not remove upload {}: {}", self.0.display(), e);
        }
    }
}

struct InvokeForm {
    prompt: String,
    thread_id: String,
    upload: Option<UploadGuard>,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn invoke(State(state): State<Arc<AppState>>, multipart: Multipart) -> ApiResult<Json<InvokeResponse>> {
    let upload_dir = state.orchestrator.settings().upload_dir();
    let form = read_invoke_form(multipart, &upload_dir).await?;
    let attachment = form.upload.as_ref().map(|guard| guard.0.as_path());

    let turn = state
        .orchestrator
        .agent()
        .run(&form.thread_id, &form.prompt, attachment)
        .await?;

    Ok(Json(InvokeResponse {
        response: turn.content,
        thread_id: turn.conversation_id,
        artifacts: turn.artifacts,
    }))
}

async fn read_invoke_form(mut multipart: Multipart, upload_dir: &Path) -> ApiResult<InvokeForm> {
    let mut prompt = None;
    let mut thread_id = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("prompt") => prompt = Some(field.text().await.map_err(invalid_form)?),
            Some("thread_id") => thread_id = Some(field.text().await.map_err(invalid_form)?),
            Some("file") => {
                let extension = field.file_name().and_then(upload_extension);
                let data = field.bytes().await.map_err(invalid_form)?;
                if data.is_empty() {
                    continue;
                }

                let stored_name = match extension {
                    Some(ext) => format!("upload_{}.{}", Uuid::new_v4(), ext),
                    None => format!("upload_{}", Uuid::new_v4()),
                };
                let path = upload_dir.join(stored_name);
                tokio::fs::create_dir_all(upload_dir)
                    .await
                    .map_err(MuseError::from)?;
                tokio::fs::write(&path, &data).await.map_err(MuseError::from)?;
                debug!("Saved upload ({} bytes) to {}", data.len(), path.display());
                upload = Some(UploadGuard(path));
            }
            Some(other) => warn!("Ignoring unknown form field '{}'", other),
            None => {}
        }
    }

    let prompt = prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| MuseError::Validation("prompt is required".to_string()))?;
    let thread_id = thread_id
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| MuseError::Validation("thread_id is required".to_string()))?;

    Ok(InvokeForm {
        prompt,
        thread_id,
        upload,
    })
}

fn invalid_form(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError(MuseError::Validation(format!("Invalid form data: {}", e)))
}

/// Extension of an uploaded file name, if it is plain alphanumeric.
fn upload_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
}

fn ndjson(emitter: StreamingEmitter) -> Response {
    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(emitter.into_ndjson()),
    )
        .into_response()
}

async fn poem_stream(State(state): State<Arc<AppState>>, Json(req): Json<MessageRequest>) -> ApiResult<Response> {
    let emitter = state.orchestrator.poet().stream(&req.input).await?;
    Ok(ndjson(emitter))
}

async fn recruiter_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MessageRequest>,
) -> ApiResult<Response> {
    let emitter = state.orchestrator.cv().chat().stream(&req.input).await?;
    Ok(ndjson(emitter))
}

async fn evaluate_cv(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CvEvaluationRequest>,
) -> ApiResult<Response> {
    let emitter = state.orchestrator.cv().evaluate(&req).await?;
    Ok(ndjson(emitter))
}

async fn get_default_criteria() -> impl IntoResponse {
    Json(serde_json::json!({ "default_criteria": default_criteria() }))
}

async fn generate_outline(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OutlineRequest>,
) -> ApiResult<Json<OutlineBody>> {
    let outline = state
        .orchestrator
        .presentation()
        .generate_outline(&req.topic, &req.source_text)
        .await?;
    Ok(Json(OutlineBody { outline }))
}

async fn enrich_outline(State(state): State<Arc<AppState>>, Json(req): Json<OutlineBody>) -> ApiResult<Json<OutlineBody>> {
    if req.outline.is_empty() {
        return Err(MuseError::Validation("outline must not be empty".to_string()).into());
    }
    let outline = state.orchestrator.presentation().enrich_slides(req.outline).await;
    Ok(Json(OutlineBody { outline }))
}

async fn list_menu(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let items = state.orchestrator.menu().read_all().map_err(MuseError::from)?;
    Ok(Json(serde_json::json!({ "total": items.len(), "items": items })))
}
