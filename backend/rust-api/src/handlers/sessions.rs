use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::{answer::SubmitAnswerRequest, UsePowerUpRequest},
    services::AppState,
};

/// POST /api/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.sessions.create_session().await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.snapshot(session_id).await?))
}

/// POST /api/sessions/{id}/begin
///
/// Starts the quiz from the start screen, or restarts it from the summary.
pub async fn begin_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Beginning session: {}", session_id);
    Ok(Json(state.sessions.begin(session_id).await?))
}

/// POST /api/sessions/{id}/answers
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .sessions
        .submit_answer_for(session_id, req.question_index, req.option_index)
        .await?;
    Ok(Json(response))
}

/// POST /api/sessions/{id}/powerups
pub async fn use_powerup(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    AppJson(req): AppJson<UsePowerUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.use_powerup(session_id, req.kind).await?))
}
