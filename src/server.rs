//! HTTP surface over [`StudyService`]

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use eyre::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatAnswer, ChatRequest};
use crate::completion::Credential;
use crate::config::Config;
use crate::error::PipelineError;
use crate::service::StudyService;
use crate::study::StudyBundle;

const CREDENTIAL_HEADERS: [&str; 2] = ["x-api-key", "x-gemini-api-key"];
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct VideoRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

pub fn router(service: Arc<StudyService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/analyze_video", post(analyze_video_handler))
        .route("/api/analyze_text", post(analyze_text_handler))
        .route("/api/analyze_pdf", post(analyze_pdf_handler))
        .route("/api/chat", post(chat_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

pub async fn serve(service: Arc<StudyService>, config: &Config) -> Result<()> {
    let app = router(service, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "studyx",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn analyze_video_handler(
    State(service): State<Arc<StudyService>>,
    headers: HeaderMap,
    body: Result<Json<VideoRequest>, JsonRejection>,
) -> Response {
    respond(analyze_video(&service, &headers, body).await)
}

async fn analyze_text_handler(
    State(service): State<Arc<StudyService>>,
    headers: HeaderMap,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    respond(analyze_text(&service, &headers, body).await)
}

async fn analyze_pdf_handler(
    State(service): State<Arc<StudyService>>,
    headers: HeaderMap,
    body: Result<Multipart, MultipartRejection>,
) -> Response {
    respond(analyze_pdf(&service, &headers, body).await)
}

async fn chat_handler(
    State(service): State<Arc<StudyService>>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    respond(chat(&service, &headers, body).await)
}

async fn analyze_video(
    service: &StudyService,
    headers: &HeaderMap,
    body: Result<Json<VideoRequest>, JsonRejection>,
) -> Result<StudyBundle, PipelineError> {
    let credential = authorize(headers)?;
    let Json(req) = body.map_err(json_rejected)?;
    service.analyze_url(Some(credential.expose()), &req.url).await
}

async fn analyze_text(
    service: &StudyService,
    headers: &HeaderMap,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<StudyBundle, PipelineError> {
    let credential = authorize(headers)?;
    let Json(req) = body.map_err(json_rejected)?;
    service.analyze_text(Some(credential.expose()), &req.text).await
}

async fn analyze_pdf(
    service: &StudyService,
    headers: &HeaderMap,
    body: Result<Multipart, MultipartRejection>,
) -> Result<StudyBundle, PipelineError> {
    let credential = authorize(headers)?;
    let mut multipart = body.map_err(|e| rejected(e.status(), e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_failed)? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await.map_err(multipart_failed)?;
            return service.analyze_document(Some(credential.expose()), &bytes).await;
        }
    }
    Err(PipelineError::MalformedRequest(format!("missing multipart field `{UPLOAD_FIELD}`")))
}

async fn chat(
    service: &StudyService,
    headers: &HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<ChatAnswer, PipelineError> {
    let credential = authorize(headers)?;
    let Json(req) = body.map_err(json_rejected)?;
    service.chat(Some(credential.expose()), &req).await
}

/// Credential gate, applied before the request body is looked at.
fn authorize(headers: &HeaderMap) -> Result<Credential, PipelineError> {
    Credential::parse(credential(headers).as_deref())
}

fn credential(headers: &HeaderMap) -> Option<String> {
    CREDENTIAL_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn rejected(status: StatusCode, detail: String) -> PipelineError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        PipelineError::PayloadTooLarge
    } else {
        PipelineError::MalformedRequest(detail)
    }
}

fn json_rejected(e: JsonRejection) -> PipelineError {
    rejected(e.status(), e.body_text())
}

fn multipart_failed(e: MultipartError) -> PipelineError {
    rejected(e.status(), e.body_text())
}

fn respond<T: Serialize>(result: Result<T, PipelineError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            warn!("Request failed: {e}");
            let status = StatusCode::from_u16(e.status().http_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(e.payload())).into_response()
        }
    }
}
