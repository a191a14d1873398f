use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    TimerTick(TimerTick),
    TimeExpired(TimeExpired),
    AnswerResolved(AnswerResolved),
    LevelUp(LevelUp),
    QuizFinished(QuizFinished),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimerTick {
    pub session_id: String,
    pub question_index: usize,
    pub remaining_seconds: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimeExpired {
    pub session_id: String,
    pub question_index: usize,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnswerResolved {
    pub session_id: String,
    pub question_index: usize,
    pub correct: bool,
    pub points: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LevelUp {
    pub session_id: String,
    pub level: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuizFinished {
    pub session_id: String,
    pub score: f64,
    pub total_questions: usize,
}

impl SessionEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::TimerTick(_) => "timer-tick",
            SessionEvent::TimeExpired(_) => "time-expired",
            SessionEvent::AnswerResolved(_) => "answer-resolved",
            SessionEvent::LevelUp(_) => "level-up",
            SessionEvent::QuizFinished(_) => "quiz-finished",
        }
    }
}
