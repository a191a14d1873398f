use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{error::ApiError, models::results::ResultsResponse, services::AppState};

/// GET /api/results
pub async fn get_results(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let results = state.results.get().await?.ok_or(ApiError::ResultsNotFound)?;
    let summary = results.summary();

    Ok(Json(ResultsResponse { results, summary }))
}
