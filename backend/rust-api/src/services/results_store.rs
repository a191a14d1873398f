use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;

use crate::models::results::QuizResults;

#[derive(Debug, thiserror::Error)]
pub enum ResultsStoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("stored results are not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Single-slot storage for the results of the most recent finished session.
/// Every `put` overwrites the previous value; there is no expiry.
#[async_trait]
pub trait ResultsStore: Send + Sync {
    async fn put(&self, results: &QuizResults) -> Result<(), ResultsStoreError>;

    async fn get(&self) -> Result<Option<QuizResults>, ResultsStoreError>;

    async fn ping(&self) -> Result<(), ResultsStoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str;
}

#[derive(Default)]
pub struct InMemoryResultsStore {
    slot: RwLock<Option<QuizResults>>,
}

impl InMemoryResultsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultsStore for InMemoryResultsStore {
    async fn put(&self, results: &QuizResults) -> Result<(), ResultsStoreError> {
        *self.slot.write().await = Some(results.clone());
        Ok(())
    }

    async fn get(&self) -> Result<Option<QuizResults>, ResultsStoreError> {
        Ok(self.slot.read().await.clone())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Keeps the slot as a JSON string under one fixed Redis key.
pub struct RedisResultsStore {
    redis: ConnectionManager,
    key: String,
}

impl RedisResultsStore {
    pub async fn connect(uri: &str, key: impl Into<String>) -> anyhow::Result<Self> {
        let client = redis::Client::open(uri).context("Invalid Redis URI")?;

        tracing::info!("Attempting to connect to Redis...");
        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        let store = Self {
            redis,
            key: key.into(),
        };

        tokio::time::timeout(std::time::Duration::from_secs(5), store.ping())
            .await
            .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established, results key={}", store.key);
        Ok(store)
    }
}

#[async_trait]
impl ResultsStore for RedisResultsStore {
    async fn put(&self, results: &QuizResults) -> Result<(), ResultsStoreError> {
        let json = serde_json::to_string(results)?;
        let mut conn = self.redis.clone();

        redis::cmd("SET")
            .arg(&self.key)
            .arg(&json)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn get(&self) -> Result<Option<QuizResults>, ResultsStoreError> {
        let mut conn = self.redis.clone();

        let stored: Option<String> = redis::cmd("GET")
            .arg(&self.key)
            .query_async(&mut conn)
            .await?;

        match stored {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), ResultsStoreError> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
