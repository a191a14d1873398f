use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::metrics::{QUIZ_FETCH_DURATION_SECONDS, QUIZ_FETCH_TOTAL};
use crate::models::quiz::Quiz;

const EMBEDDED_QUIZ: &str = include_str!("../../data/fallback_quiz.json");

#[derive(Debug, thiserror::Error)]
pub enum QuizSourceError {
    #[error("request to quiz source failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("quiz source answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("quiz document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Supplier of quiz documents. One fetch per session start, no retries.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// The raw document, exactly as the source served it.
    async fn fetch_document(&self) -> Result<Value, QuizSourceError>;

    async fn fetch_quiz(&self) -> Result<Quiz, QuizSourceError> {
        let document = self.fetch_document().await?;
        Ok(serde_json::from_value(document)?)
    }

    fn name(&self) -> &'static str;
}

pub struct HttpQuizSource {
    client: Client,
    url: Url,
}

impl HttpQuizSource {
    pub fn new(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            client: Client::new(),
            url: Url::parse(url)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn get_json(&self) -> Result<Value, QuizSourceError> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuizSourceError::Status(status));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl QuizSource for HttpQuizSource {
    async fn fetch_document(&self) -> Result<Value, QuizSourceError> {
        tracing::debug!("Fetching quiz document from {}", self.url);

        let start = Instant::now();
        let result = self.get_json().await;

        QUIZ_FETCH_DURATION_SECONDS
            .with_label_values(&[self.name()])
            .observe(start.elapsed().as_secs_f64());
        let status = if result.is_ok() { "success" } else { "error" };
        QUIZ_FETCH_TOTAL
            .with_label_values(&[self.name(), status])
            .inc();

        if let Err(e) = &result {
            tracing::warn!("Quiz source {} failed: {}", self.url, e);
        }
        result
    }

    fn name(&self) -> &'static str {
        "upstream"
    }
}

/// Serves a fixed document. `embedded()` is the small built-in question set.
pub struct StaticQuizSource {
    document: Value,
}

impl StaticQuizSource {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    pub fn embedded() -> Result<Self, QuizSourceError> {
        Ok(Self::new(serde_json::from_str(EMBEDDED_QUIZ)?))
    }
}

#[async_trait]
impl QuizSource for StaticQuizSource {
    async fn fetch_document(&self) -> Result<Value, QuizSourceError> {
        QUIZ_FETCH_TOTAL
            .with_label_values(&[self.name(), "success"])
            .inc();
        Ok(self.document.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Tries `primary` and falls back to `fallback` when it fails.
pub struct FallbackQuizSource {
    primary: Arc<dyn QuizSource>,
    fallback: Arc<dyn QuizSource>,
}

impl FallbackQuizSource {
    pub fn new(primary: Arc<dyn QuizSource>, fallback: Arc<dyn QuizSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl QuizSource for FallbackQuizSource {
    async fn fetch_document(&self) -> Result<Value, QuizSourceError> {
        self.primary.fetch_document().await
    }

    // A primary document that fetches but does not parse also falls back.
    async fn fetch_quiz(&self) -> Result<Quiz, QuizSourceError> {
        match self.primary.fetch_quiz().await {
            Ok(quiz) => Ok(quiz),
            Err(e) => {
                tracing::warn!(
                    "Quiz source {} unavailable ({}), using {} questions",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.fetch_quiz().await
            }
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
