use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use super::session_service::SessionService;

pub struct SessionReaper {
    sessions: Arc<SessionService>,
    ttl: Duration,
    interval: Duration,
}

impl SessionReaper {
    pub fn new(sessions: Arc<SessionService>, ttl: Duration) -> Self {
        // Sweep a few times per TTL, but not more than once a second.
        let interval = (ttl / 4).max(Duration::from_secs(1));
        Self {
            sessions,
            ttl,
            interval,
        }
    }

    pub async fn run(self) {
        info!(
            "Starting session reaper (ttl {}s, interval {}s)",
            self.ttl.as_secs(),
            self.interval.as_secs()
        );

        loop {
            sleep(self.interval).await;
            self.run_once().await;
        }
    }

    pub async fn run_once(&self) -> usize {
        let evicted = self.sessions.evict_idle(self.ttl).await;
        if evicted > 0 {
            info!(evicted, "Evicted idle quiz sessions");
        } else {
            debug!("Session reaper tick: nothing to evict");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quiz_session::GameRules;
    use crate::services::quiz_source::StaticQuizSource;
    use crate::services::results_store::InMemoryResultsStore;

    #[tokio::test(start_paused = true)]
    async fn reaper_removes_sessions_past_ttl() {
        let sessions = Arc::new(SessionService::new(
            Arc::new(StaticQuizSource::embedded().unwrap()),
            Arc::new(InMemoryResultsStore::new()),
            GameRules::default(),
            Duration::from_secs(1),
        ));
        sessions.create_session().await.unwrap();

        let reaper = SessionReaper::new(sessions.clone(), Duration::from_secs(60));
        assert_eq!(reaper.interval, Duration::from_secs(15));
        assert_eq!(reaper.run_once().await, 0);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(reaper.run_once().await, 1);
        assert_eq!(sessions.active_count().await, 0);
    }
}
