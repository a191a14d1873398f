use serde::{Deserialize, Serialize};

use super::SessionSnapshot;

/// `option_index: null` (or an absent field) submits "no answer". When
/// `question_index` is given, the answer only counts for that question.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub option_index: Option<usize>,
    #[serde(default)]
    pub question_index: Option<usize>,
}

/// Points awarded for one correct answer, each part computed from the
/// streak, timer and multiplier as they stood before the answer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PointsBreakdown {
    pub base: f64,
    pub streak_bonus: f64,
    pub time_bonus: f64,
    pub combo_bonus: f64,
}

impl PointsBreakdown {
    pub fn total(&self) -> f64 {
        self.base + self.streak_bonus + self.time_bonus + self.combo_bonus
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerOutcome {
    pub question_index: usize,
    pub correct: bool,
    pub timed_out: bool,
    pub points: f64,
    pub breakdown: Option<PointsBreakdown>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub level_ups: Vec<u32>,
    pub finished: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub outcome: Option<AnswerOutcome>,
    pub session: SessionSnapshot,
}
