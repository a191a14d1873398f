use serde::{Deserialize, Serialize};

pub mod answer;
pub mod quiz;
pub mod results;
pub mod timer;

use results::ResultsSummary;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Start,
    Playing,
    Summary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    ExtraTime,
    FiftyFifty,
    ExtraLife,
}

impl PowerUpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerUpKind::ExtraTime => "extra_time",
            PowerUpKind::FiftyFifty => "fifty_fifty",
            PowerUpKind::ExtraLife => "extra_life",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PowerUps {
    pub extra_time: u32,
    pub fifty_fifty: u32,
    pub extra_life: u32,
}

impl Default for PowerUps {
    fn default() -> Self {
        Self {
            extra_time: 2,
            fifty_fifty: 1,
            extra_life: 1,
        }
    }
}

impl PowerUps {
    pub fn count(&self, kind: PowerUpKind) -> u32 {
        match kind {
            PowerUpKind::ExtraTime => self.extra_time,
            PowerUpKind::FiftyFifty => self.fifty_fifty,
            PowerUpKind::ExtraLife => self.extra_life,
        }
    }

    pub fn count_mut(&mut self, kind: PowerUpKind) -> &mut u32 {
        match kind {
            PowerUpKind::ExtraTime => &mut self.extra_time,
            PowerUpKind::FiftyFifty => &mut self.fifty_fifty,
            PowerUpKind::ExtraLife => &mut self.extra_life,
        }
    }

    /// Level-up reward.
    pub fn grant_one_each(&mut self) {
        self.extra_time += 1;
        self.fifty_fifty += 1;
        self.extra_life += 1;
    }
}

#[derive(Debug, Deserialize)]
pub struct UsePowerUpRequest {
    pub kind: PowerUpKind,
}

#[derive(Debug, Serialize)]
pub struct UsePowerUpResponse {
    pub applied: bool,
    pub session: SessionSnapshot,
}

/// Quiz metadata shown before play begins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizInfo {
    pub title: String,
    pub questions_count: u32,
    pub max_mistakes: u32,
    pub points_per_correct: f64,
    pub points_per_wrong: f64,
    pub starting_powerups: PowerUps,
}

/// A question as shown to the player: option correctness stays server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionView {
    pub index: usize,
    pub number: usize,
    pub total: usize,
    pub remaining: usize,
    pub description: String,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionView {
    pub index: usize,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub id: String,
    pub phase: GamePhase,
    pub quiz: QuizInfo,
    pub question: Option<QuestionView>,
    pub score: f64,
    pub lives: u32,
    pub mistakes: u32,
    pub streak: u32,
    pub combo_multiplier: f64,
    pub xp: u64,
    pub level: u32,
    pub xp_for_next_level: u64,
    pub powerups: PowerUps,
    pub timer_seconds: u32,
    pub selected_answer: Option<usize>,
    pub answered_count: usize,
    pub summary: Option<ResultsSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powerup_kind_uses_snake_case_on_the_wire() {
        let req: UsePowerUpRequest = serde_json::from_str(r#"{"kind":"fifty_fifty"}"#).unwrap();
        assert_eq!(req.kind, PowerUpKind::FiftyFifty);
        assert_eq!(req.kind.as_str(), "fifty_fifty");
    }

    #[test]
    fn grant_one_each_bumps_every_count() {
        let mut powerups = PowerUps::default();
        powerups.grant_one_each();
        assert_eq!(
            powerups,
            PowerUps {
                extra_time: 3,
                fifty_fifty: 2,
                extra_life: 2
            }
        );
    }
}
