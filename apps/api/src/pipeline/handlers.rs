//! Axum route handlers for the pipeline API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{NewRole, RoleEntry, TailoredResume, UserRecord};
use crate::pipeline::{NormalizeOutcome, PipelineState};
use crate::state::AppState;
use crate::tailoring::TailorRequest;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CaptureHistoryRequest {
    pub work_history: Vec<NewRole>,
}

#[derive(Debug, Deserialize)]
pub struct AddInputRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub state: PipelineState,
    pub record: UserRecord,
}

#[derive(Debug, Serialize)]
pub struct TailorResponse {
    pub key: String,
    pub resume: TailoredResume,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/users/:user_id
pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let record = state.pipeline.record(&user_id).await?;
    Ok(Json(UserResponse {
        state: PipelineState::of(Some(&record)),
        record,
    }))
}

/// POST /api/v1/users/:user_id/history
///
/// Stores the raw work history. Only legal for a user with no history yet.
pub async fn handle_capture_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<CaptureHistoryRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let record = state
        .pipeline
        .capture_history(&user_id, request.work_history)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            state: PipelineState::of(Some(&record)),
            record,
        }),
    ))
}

/// POST /api/v1/users/:user_id/history/:role_id/inputs
pub async fn handle_add_input(
    State(state): State<AppState>,
    Path((user_id, role_id)): Path<(String, String)>,
    Json(request): Json<AddInputRequest>,
) -> Result<Json<RoleEntry>, AppError> {
    let entry = state
        .pipeline
        .add_description_input(&user_id, &role_id, &request.text)
        .await?;
    Ok(Json(entry))
}

/// POST /api/v1/users/:user_id/normalize
///
/// Runs one normalization pass. Per-role failures are reported in the body,
/// not as an error status.
pub async fn handle_normalize(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<NormalizeOutcome>, AppError> {
    Ok(Json(state.pipeline.normalize_history(&user_id).await?))
}

/// POST /api/v1/users/:user_id/resumes
pub async fn handle_tailor(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<TailorRequest>,
) -> Result<(StatusCode, Json<TailorResponse>), AppError> {
    let resume = state.pipeline.tailor_resume(&user_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(TailorResponse {
            key: resume.key(),
            resume,
        }),
    ))
}

/// GET /api/v1/users/:user_id/resumes/:key
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path((user_id, key)): Path<(String, String)>,
) -> Result<Json<TailoredResume>, AppError> {
    Ok(Json(state.pipeline.resume(&user_id, &key).await?))
}
