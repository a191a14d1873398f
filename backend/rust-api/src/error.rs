use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::{quiz_source::QuizSourceError, results_store::ResultsStoreError};

/// Errors surfaced to HTTP clients. Every variant renders as
/// `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Proxy failure; the message is part of the public contract.
    #[error("Failed to fetch quiz data")]
    UpstreamUnavailable(#[source] QuizSourceError),

    #[error("Failed to load quiz")]
    QuizUnavailable(#[source] QuizSourceError),

    #[error("Session not found")]
    SessionNotFound,

    #[error("No quiz results found. Please complete a quiz first.")]
    ResultsNotFound,

    #[error("Failed to read quiz results")]
    Storage(#[from] ResultsStoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UpstreamUnavailable(_)
            | ApiError::QuizUnavailable(_)
            | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::SessionNotFound | ApiError::ResultsNotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::ResultsNotFound => json!({
                "error": self.to_string(),
                "back_to_quiz": "/api/sessions",
            }),
            _ => json!({ "error": self.to_string() }),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        }

        (status, Json(body)).into_response()
    }
}
