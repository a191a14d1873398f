use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use super::quiz_session::{GameRules, QuizSession, TickOutcome};
use super::quiz_source::QuizSource;
use super::results_store::ResultsStore;
use crate::error::ApiError;
use crate::metrics::{
    answer_result_label, ANSWERS_SUBMITTED_TOTAL, POWERUPS_USED_TOTAL, SESSIONS_ACTIVE,
    SESSIONS_TOTAL,
};
use crate::models::{
    answer::{AnswerOutcome, SubmitAnswerResponse},
    timer::{AnswerResolved, LevelUp, QuizFinished, SessionEvent, TimeExpired, TimerTick},
    GamePhase, PowerUpKind, SessionSnapshot, UsePowerUpResponse,
};

const EVENT_BUFFER: usize = 64;

struct SessionSlot {
    session: QuizSession,
    countdown: Option<JoinHandle<()>>,
}

/// One live session. Every mutation goes through `slot`, so user actions and
/// countdown ticks are applied one at a time.
pub struct SessionHandle {
    id: Uuid,
    slot: Mutex<SessionSlot>,
    events: broadcast::Sender<SessionEvent>,
    results: Arc<dyn ResultsStore>,
    tick_interval: Duration,
    created: Instant,
    last_active_ms: AtomicU64,
}

impl SessionHandle {
    fn new(
        id: Uuid,
        session: QuizSession,
        results: Arc<dyn ResultsStore>,
        tick_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            id,
            slot: Mutex::new(SessionSlot {
                session,
                countdown: None,
            }),
            events,
            results,
            tick_interval,
            created: Instant::now(),
            last_active_ms: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let now = self.created.elapsed().as_millis() as u64;
        self.last_active_ms.store(now, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::Relaxed));
        self.created.elapsed().saturating_sub(last)
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is the common case.
        let _ = self.events.send(event);
    }

    /// Cancels the running countdown and, while playing, starts one bound to
    /// the current epoch. Called with the slot locked, so no tick can land
    /// between the transition and the re-arm.
    fn rearm(self: &Arc<Self>, slot: &mut SessionSlot) {
        if let Some(countdown) = slot.countdown.take() {
            countdown.abort();
        }
        if slot.session.phase() == GamePhase::Playing {
            slot.countdown = Some(spawn_countdown(Arc::clone(self), slot.session.epoch()));
        }
    }

    async fn record_outcome(self: &Arc<Self>, slot: &mut SessionSlot, outcome: &AnswerOutcome) {
        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[answer_result_label(outcome.correct, outcome.timed_out)])
            .inc();

        tracing::info!(
            session = %self.id,
            question = outcome.question_index,
            correct = outcome.correct,
            timed_out = outcome.timed_out,
            points = outcome.points,
            "Answer resolved"
        );

        self.publish(SessionEvent::AnswerResolved(AnswerResolved {
            session_id: self.id.to_string(),
            question_index: outcome.question_index,
            correct: outcome.correct,
            points: outcome.points,
        }));
        for level in &outcome.level_ups {
            tracing::info!(session = %self.id, level, "Level up");
            self.publish(SessionEvent::LevelUp(LevelUp {
                session_id: self.id.to_string(),
                level: *level,
            }));
        }

        if outcome.finished {
            self.record_results(slot).await;
        }
        self.rearm(slot);
    }

    /// Writes the finished session's results to the last-results slot. A
    /// storage failure is logged; the session still ends.
    async fn record_results(&self, slot: &SessionSlot) {
        let Some(results) = slot.session.results() else {
            return;
        };

        SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
        if let Err(e) = self.results.put(results).await {
            tracing::error!(session = %self.id, "Failed to store quiz results: {}", e);
        }

        tracing::info!(
            session = %self.id,
            score = results.score,
            answered = results.answered_questions.len(),
            total = results.total_questions,
            "Quiz finished"
        );
        self.publish(SessionEvent::QuizFinished(QuizFinished {
            session_id: self.id.to_string(),
            score: results.score,
            total_questions: results.total_questions,
        }));
    }
}

fn spawn_countdown(handle: Arc<SessionHandle>, epoch: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = handle.tick_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let mut slot = handle.slot.lock().await;
            if slot.session.epoch() != epoch {
                break;
            }

            let question_index = slot.session.current_question();
            match slot.session.tick() {
                TickOutcome::Idle => break,
                TickOutcome::Ticked { remaining } => {
                    handle.publish(SessionEvent::TimerTick(TimerTick {
                        session_id: handle.id.to_string(),
                        question_index,
                        remaining_seconds: remaining,
                        timestamp: Utc::now(),
                    }));
                }
                TickOutcome::Expired(outcome) => {
                    // This task's own handle; re-arming must not abort it.
                    slot.countdown.take();
                    handle.publish(SessionEvent::TimeExpired(TimeExpired {
                        session_id: handle.id.to_string(),
                        question_index,
                        timestamp: Utc::now(),
                        message: "Time limit exceeded".to_string(),
                    }));
                    handle.record_outcome(&mut slot, &outcome).await;
                    break;
                }
            }
        }
    })
}

/// In-process registry of quiz sessions.
pub struct SessionService {
    sessions: RwLock<HashMap<Uuid, Arc<SessionHandle>>>,
    source: Arc<dyn QuizSource>,
    results: Arc<dyn ResultsStore>,
    rules: GameRules,
    tick_interval: Duration,
}

impl SessionService {
    pub fn new(
        source: Arc<dyn QuizSource>,
        results: Arc<dyn ResultsStore>,
        rules: GameRules,
        tick_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            source,
            results,
            rules,
            tick_interval,
        }
    }

    /// Fetches a quiz and parks a new session in the `start` phase.
    pub async fn create_session(&self) -> Result<SessionSnapshot, ApiError> {
        let quiz = self.source.fetch_quiz().await.map_err(|e| {
            SESSIONS_TOTAL.with_label_values(&["fetch_failed"]).inc();
            ApiError::QuizUnavailable(e)
        })?;

        let id = Uuid::new_v4();
        let session = QuizSession::new(Arc::new(quiz), self.rules.clone());
        let snapshot = session.snapshot(&id.to_string());

        let handle = Arc::new(SessionHandle::new(
            id,
            session,
            Arc::clone(&self.results),
            self.tick_interval,
        ));
        handle.touch();
        self.sessions.write().await.insert(id, handle);

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_ACTIVE.inc();
        tracing::info!(
            session = %id,
            title = %snapshot.quiz.title,
            questions = snapshot.quiz.questions_count,
            "Session created"
        );

        Ok(snapshot)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, ApiError> {
        let handle = self.handle(id).await?;
        let slot = handle.slot.lock().await;
        Ok(slot.session.snapshot(&id.to_string()))
    }

    /// Begin, or try again from the summary.
    pub async fn begin(&self, id: Uuid) -> Result<SessionSnapshot, ApiError> {
        let handle = self.handle(id).await?;
        let mut slot = handle.slot.lock().await;

        if slot.session.begin() {
            SESSIONS_TOTAL.with_label_values(&["started"]).inc();
            tracing::info!(session = %id, "Session started");

            if slot.session.phase() == GamePhase::Summary {
                handle.record_results(&slot).await;
            }
            handle.rearm(&mut slot);
        }

        Ok(slot.session.snapshot(&id.to_string()))
    }

    pub async fn submit_answer(
        &self,
        id: Uuid,
        option_index: Option<usize>,
    ) -> Result<SubmitAnswerResponse, ApiError> {
        self.submit_answer_for(id, None, option_index).await
    }

    /// Like `submit_answer`, but an answer aimed at another question than the
    /// current one (say, one the countdown already expired) is ignored.
    pub async fn submit_answer_for(
        &self,
        id: Uuid,
        question_index: Option<usize>,
        option_index: Option<usize>,
    ) -> Result<SubmitAnswerResponse, ApiError> {
        let handle = self.handle(id).await?;
        let mut slot = handle.slot.lock().await;

        let current = slot.session.current_question();
        let outcome = match question_index {
            Some(expected) if expected != current => {
                tracing::debug!(session = %id, expected, current, "Stale answer ignored");
                None
            }
            _ => slot.session.submit_answer(option_index),
        };
        match &outcome {
            Some(outcome) => handle.record_outcome(&mut slot, outcome).await,
            None => tracing::debug!(session = %id, ?option_index, "Answer ignored"),
        }

        Ok(SubmitAnswerResponse {
            outcome,
            session: slot.session.snapshot(&id.to_string()),
        })
    }

    pub async fn use_powerup(
        &self,
        id: Uuid,
        kind: PowerUpKind,
    ) -> Result<UsePowerUpResponse, ApiError> {
        let handle = self.handle(id).await?;
        let mut slot = handle.slot.lock().await;

        let applied = slot.session.use_powerup(kind, &mut rand::rng());
        if applied {
            POWERUPS_USED_TOTAL.with_label_values(&[kind.as_str()]).inc();
            tracing::info!(session = %id, kind = kind.as_str(), "Power-up used");
        } else {
            tracing::debug!(session = %id, kind = kind.as_str(), "Power-up ignored");
        }

        Ok(UsePowerUpResponse {
            applied,
            session: slot.session.snapshot(&id.to_string()),
        })
    }

    pub async fn subscribe(&self, id: Uuid) -> Result<broadcast::Receiver<SessionEvent>, ApiError> {
        let handle = self.handle(id).await?;
        Ok(handle.events.subscribe())
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than `ttl` and stops their countdowns.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let evicted: Vec<Arc<SessionHandle>> = {
            let mut sessions = self.sessions.write().await;
            let expired: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, handle)| handle.idle_for() > ttl)
                .map(|(id, _)| *id)
                .collect();
            expired
                .iter()
                .filter_map(|id| sessions.remove(id))
                .collect()
        };

        for handle in &evicted {
            if let Some(countdown) = handle.slot.lock().await.countdown.take() {
                countdown.abort();
            }
            SESSIONS_ACTIVE.dec();
            SESSIONS_TOTAL.with_label_values(&["evicted"]).inc();
        }

        evicted.len()
    }

    async fn handle(&self, id: Uuid) -> Result<Arc<SessionHandle>, ApiError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ApiError::SessionNotFound)?;
        handle.touch();
        Ok(handle)
    }
}
