use std::sync::Arc;

use crate::config::Config;
use quiz_source::{FallbackQuizSource, HttpQuizSource, QuizSource, StaticQuizSource};
use results_store::{InMemoryResultsStore, RedisResultsStore, ResultsStore};
use session_service::SessionService;

pub struct AppState {
    pub config: Config,
    /// Backs `GET /api/quiz`; never falls back.
    pub upstream: Arc<dyn QuizSource>,
    pub results: Arc<dyn ResultsStore>,
    pub sessions: Arc<SessionService>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let upstream: Arc<dyn QuizSource> = Arc::new(HttpQuizSource::new(&config.quiz_source_url)?);
        tracing::info!(url = %config.quiz_source_url, "Quiz source configured");

        let results: Arc<dyn ResultsStore> = match config.redis_uri.as_deref() {
            Some(uri) => {
                Arc::new(RedisResultsStore::connect(uri, config.results_key.clone()).await?)
            }
            None => {
                tracing::info!("REDIS_URI not set, keeping quiz results in memory");
                Arc::new(InMemoryResultsStore::new())
            }
        };

        Self::from_parts(config, upstream, results)
    }

    /// Assembles the state from ready-made collaborators. Sessions read from
    /// `upstream`, or from the embedded quiz when it fails and the fallback is on.
    pub fn from_parts(
        config: Config,
        upstream: Arc<dyn QuizSource>,
        results: Arc<dyn ResultsStore>,
    ) -> anyhow::Result<Self> {
        let session_source: Arc<dyn QuizSource> = if config.embedded_fallback {
            tracing::info!("Embedded quiz fallback enabled");
            Arc::new(FallbackQuizSource::new(
                Arc::clone(&upstream),
                Arc::new(StaticQuizSource::embedded()?),
            ))
        } else {
            Arc::clone(&upstream)
        };

        let sessions = Arc::new(SessionService::new(
            session_source,
            Arc::clone(&results),
            config.game_rules(),
            config.tick_interval(),
        ));

        Ok(Self {
            config,
            upstream,
            results,
            sessions,
        })
    }
}

pub mod quiz_session;
pub mod quiz_source;
pub mod results_store;
pub mod session_reaper;
pub mod session_service;
