use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{error::ApiError, services::AppState};

/// GET /api/quiz
///
/// Relays the upstream quiz document unchanged. Any failure (transport, non-2xx
/// status, unparseable body) becomes a 500 with a fixed message.
pub async fn proxy_quiz(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let document = state.upstream.fetch_document().await.map_err(|e| {
        tracing::warn!(source = state.upstream.name(), error = %e, "Quiz proxy fetch failed");
        ApiError::UpstreamUnavailable(e)
    })?;

    Ok(Json(document))
}
