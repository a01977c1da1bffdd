//! HTTP routes and handlers.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::catalog::{self, Lookup};
use crate::error::ApiError;
use crate::extract;
use crate::gemini::LanguageModel;
use crate::normalize::RiskAnalysis;
use crate::pipeline::{self, Answer};
use crate::upload::{self, UploadLimits};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// `None` when no model credential is configured.
    pub model: Option<Arc<dyn LanguageModel>>,
    pub uploads: UploadLimits,
    pub data_dir: PathBuf,
}

impl AppState {
    fn model(&self) -> Result<&dyn LanguageModel, ApiError> {
        self.model.as_deref().ok_or(ApiError::NotConfigured)
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/contracts", post(ask_question).fallback(method_not_allowed))
        .route("/api/analyze_risks", post(analyze_risks).fallback(method_not_allowed))
        .route("/api/paraphrase", post(paraphrase).fallback(method_not_allowed))
        .route("/api/questionsshort", get(list_questions))
        .route("/api/get_response", post(get_response).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Answer a question about an uploaded contract.
async fn ask_question(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<Answer>>, ApiError> {
    let model = state.model()?;
    let multipart = multipart.map_err(not_multipart)?;
    let span = info_span!("ask_question", request_id = %Uuid::new_v4());
    answer_upload(model, &state.uploads, multipart)
        .instrument(span)
        .await
        .map(Json)
}

/// Risk analysis of an uploaded contract.
async fn analyze_risks(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RiskAnalysis>, ApiError> {
    let model = state.model()?;
    let multipart = multipart.map_err(not_multipart)?;
    let span = info_span!("analyze_risks", request_id = %Uuid::new_v4());
    analyze_upload(model, &state.uploads, multipart)
        .instrument(span)
        .await
        .map(Json)
}

/// A body that is not multipart form data carries no file.
fn not_multipart(rejection: MultipartRejection) -> ApiError {
    warn!("Rejected non-multipart upload: {}", rejection);
    ApiError::bad_request("No file uploaded")
}

// The upload lives in `form` until these return, so the temporary file is
// removed on every path out of them.

async fn answer_upload(
    model: &dyn LanguageModel,
    limits: &UploadLimits,
    multipart: Multipart,
) -> Result<Vec<Answer>, ApiError> {
    let form = upload::receive(multipart, limits).await?;
    let document = form
        .document
        .as_ref()
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let question = form
        .question()
        .ok_or_else(|| ApiError::bad_request("No question provided"))?;

    info!("Received file: {} ({} bytes)", document.filename, document.size);

    let text = extract::extract_file(document.path(), &document.filename)
        .await
        .map_err(|e| {
            error!("Text extraction failed: {}", e);
            ApiError::internal(format!("Error reading file: {}", e))
        })?;
    if text.trim().is_empty() {
        return Err(ApiError::bad_request("Empty file"));
    }

    pipeline::answer_question(model, &text, question)
        .await
        .map_err(|e| {
            error!("Question answering failed: {:#}", e);
            ApiError::internal(format!("Model error: {:#}", e))
        })
}

async fn analyze_upload(
    model: &dyn LanguageModel,
    limits: &UploadLimits,
    multipart: Multipart,
) -> Result<RiskAnalysis, ApiError> {
    let form = upload::receive(multipart, limits).await?;
    let document = form
        .document
        .as_ref()
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    info!("Received file: {} ({} bytes)", document.filename, document.size);

    let text = extract::extract_file(document.path(), &document.filename)
        .await
        .map_err(|e| {
            error!("Text extraction failed: {}", e);
            ApiError::internal(format!("Analysis Error: {}", e))
        })?;

    pipeline::analyze_risks(model, &text).await.map_err(|e| {
        error!("Risk analysis failed: {:#}", e);
        ApiError::internal(format!("Analysis Error: {:#}", e))
    })
}

#[derive(Debug, Default, Deserialize)]
struct ParaphraseRequest {
    #[serde(default)]
    text: Option<String>,
}

async fn paraphrase(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<String>>, ApiError> {
    let request: ParaphraseRequest = parse_json_body(&body);
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No text provided"))?;

    let model = state.model()?;
    info!("Paraphrasing {} chars", text.chars().count());

    let paraphrases = pipeline::paraphrase(model, &text).await.map_err(|e| {
        error!("Paraphrase failed: {:#}", e);
        ApiError::Upstream {
            message: "Paraphrase failed".to_string(),
            details: format!("{:#}", e),
        }
    })?;

    Ok(Json(paraphrases))
}

async fn list_questions(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    catalog::load_questions(&state.data_dir)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Error reading questions file: {:#}", e);
            ApiError::internal("Failed to load questions")
        })
}

#[derive(Debug, Default, Deserialize)]
struct StoredResponseRequest {
    #[serde(default)]
    selected_response: Option<String>,
}

/// Look up a canned answer by its exact question text.
async fn get_response(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: StoredResponseRequest = parse_json_body(&body);
    let question = request
        .selected_response
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Question not provided"))?;

    let lookup = catalog::find_response(&state.data_dir, &question)
        .await
        .map_err(|e| {
            error!("Error reading responses file: {:#}", e);
            ApiError::internal("Internal Server Error")
        })?;

    match lookup {
        Lookup::Found(answer) => Ok(answer.into_response()),
        Lookup::NoMatch => Ok((StatusCode::NOT_FOUND, "Response not found").into_response()),
        Lookup::Unavailable => Err(ApiError::NotFound("Responses data not found".to_string())),
    }
}

/// Lenient JSON body parsing: anything unparseable becomes the default
/// request, so the handler reports the missing field instead.
fn parse_json_body<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}
