//! Quiz session state machine.
//!
//! `QuizSession` owns everything one player's run needs: phase, question
//! cursor, score, lives, streak, experience and the power-up inventory. It does
//! no I/O; the session service drives it from HTTP requests and the countdown
//! task and persists the results it produces.

use std::collections::HashMap;
use std::sync::Arc;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::models::{
    answer::{AnswerOutcome, PointsBreakdown},
    quiz::{Quiz, QuizOption, ScoringParams},
    results::{AnsweredQuestion, QuizResults},
    GamePhase, OptionView, PowerUpKind, PowerUps, QuestionView, QuizInfo, SessionSnapshot,
};

/// Tunables that are not part of the quiz document.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    pub question_seconds: u32,
    pub extra_time_seconds: u32,
    pub starting_powerups: PowerUps,
    pub xp_base: f64,
    pub xp_growth: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            question_seconds: 30,
            extra_time_seconds: 15,
            starting_powerups: PowerUps::default(),
            xp_base: 100.0,
            xp_growth: 1.5,
        }
    }
}

impl GameRules {
    /// Experience needed to leave `level`: floor(base * growth^(level - 1)).
    pub fn xp_threshold(&self, level: u32) -> u64 {
        let exponent = level.saturating_sub(1) as i32;
        let threshold = (self.xp_base * self.xp_growth.powi(exponent)).floor();
        (threshold as u64).max(1)
    }
}

pub fn combo_multiplier(streak: u32) -> f64 {
    if streak >= 5 {
        2.0
    } else if streak >= 3 {
        1.5
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not playing; the countdown should stop.
    Idle,
    Ticked { remaining: u32 },
    Expired(AnswerOutcome),
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Arc<Quiz>,
    scoring: ScoringParams,
    rules: GameRules,
    narrowed: HashMap<usize, Vec<QuizOption>>,
    phase: GamePhase,
    current_question: usize,
    score: f64,
    lives: u32,
    mistakes: u32,
    streak: u32,
    combo_multiplier: f64,
    xp: u64,
    level: u32,
    powerups: PowerUps,
    timer: u32,
    selected_answer: Option<usize>,
    answered: Vec<AnsweredQuestion>,
    results: Option<QuizResults>,
    epoch: u64,
}

impl QuizSession {
    pub fn new(quiz: Arc<Quiz>, rules: GameRules) -> Self {
        let scoring = quiz.scoring();
        Self {
            lives: scoring.max_mistakes,
            timer: rules.question_seconds,
            powerups: rules.starting_powerups,
            quiz,
            scoring,
            rules,
            narrowed: HashMap::new(),
            phase: GamePhase::Start,
            current_question: 0,
            score: 0.0,
            mistakes: 0,
            streak: 0,
            combo_multiplier: 1.0,
            xp: 0,
            level: 1,
            selected_answer: None,
            answered: Vec::new(),
            results: None,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn current_question(&self) -> usize {
        self.current_question
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn xp(&self) -> u64 {
        self.xp
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn powerups(&self) -> PowerUps {
        self.powerups
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn answered(&self) -> &[AnsweredQuestion] {
        &self.answered
    }

    pub fn results(&self) -> Option<&QuizResults> {
        self.results.as_ref()
    }

    /// Changes whenever the question in play changes or play ends. A countdown
    /// armed for one epoch must not touch the session in another.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Options of the question in play, after any fifty-fifty narrowing.
    pub fn current_options(&self) -> &[QuizOption] {
        if let Some(options) = self.narrowed.get(&self.current_question) {
            return options;
        }
        self.quiz
            .questions
            .get(self.current_question)
            .map(|q| q.options.as_slice())
            .unwrap_or(&[])
    }

    /// `start -> playing` and `summary -> playing`. Experience and level carry
    /// over; everything else returns to its initial value. Returns false when
    /// already playing.
    pub fn begin(&mut self) -> bool {
        if self.phase == GamePhase::Playing {
            return false;
        }

        self.phase = GamePhase::Playing;
        self.current_question = 0;
        self.score = 0.0;
        self.lives = self.scoring.max_mistakes;
        self.mistakes = 0;
        self.streak = 0;
        self.combo_multiplier = 1.0;
        self.powerups = self.rules.starting_powerups;
        self.timer = self.rules.question_seconds;
        self.selected_answer = None;
        self.answered.clear();
        self.narrowed.clear();
        self.results = None;
        self.epoch += 1;

        if self.quiz.questions.is_empty() {
            self.finish();
        }
        true
    }

    /// Resolves the question in play. `None` means no answer (timeout).
    /// Returns `None` without touching state when not playing or when the
    /// index is not one of the current options.
    pub fn submit_answer(&mut self, option_index: Option<usize>) -> Option<AnswerOutcome> {
        if self.phase != GamePhase::Playing {
            return None;
        }

        let quiz = Arc::clone(&self.quiz);
        let question_index = self.current_question;
        let question = quiz.questions.get(question_index)?;

        let chosen = match option_index {
            Some(i) => Some(self.current_options().get(i)?.clone()),
            None => None,
        };
        let correct = chosen.as_ref().is_some_and(|o| o.is_correct);

        let breakdown = correct.then(|| self.points_for_correct());
        let points = breakdown
            .map(|b| b.total())
            .unwrap_or(-self.scoring.penalty);

        self.selected_answer = option_index;
        self.answered.push(AnsweredQuestion {
            question: question.description.clone(),
            user_answer: chosen.map(|o| o.description),
            correct,
            solution: question.detailed_solution.clone(),
            points,
        });

        let mut level_ups = Vec::new();
        if correct {
            self.score += points;
            self.streak += 1;
            self.combo_multiplier = combo_multiplier(self.streak);
            self.xp += points.floor().max(0.0) as u64;
            level_ups = self.apply_level_ups();
        } else {
            self.mistakes += 1;
            self.lives = self.lives.saturating_sub(1);
            self.streak = 0;
            self.combo_multiplier = 1.0;
            self.score -= self.scoring.penalty;
        }

        let finished = self.mistakes >= self.scoring.max_mistakes
            || question_index + 1 >= quiz.questions.len();

        if finished {
            self.finish();
        } else {
            self.current_question += 1;
            self.timer = self.rules.question_seconds;
            self.selected_answer = None;
        }
        self.epoch += 1;

        Some(AnswerOutcome {
            question_index,
            correct,
            timed_out: option_index.is_none(),
            points,
            breakdown,
            correct_answer: question.correct_option().map(|o| o.description.clone()),
            explanation: question.detailed_solution.clone(),
            level_ups,
            finished,
        })
    }

    /// One countdown step. Reaching zero submits "no answer".
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != GamePhase::Playing {
            return TickOutcome::Idle;
        }

        self.timer = self.timer.saturating_sub(1);
        if self.timer > 0 {
            return TickOutcome::Ticked {
                remaining: self.timer,
            };
        }

        match self.submit_answer(None) {
            Some(outcome) => TickOutcome::Expired(outcome),
            None => TickOutcome::Idle,
        }
    }

    /// Returns whether the power-up took effect. Using one with a zero count,
    /// outside play, or a fifty-fifty on a question that cannot be narrowed
    /// changes nothing.
    pub fn use_powerup<R: Rng + ?Sized>(&mut self, kind: PowerUpKind, rng: &mut R) -> bool {
        if self.phase != GamePhase::Playing || self.powerups.count(kind) == 0 {
            return false;
        }

        match kind {
            PowerUpKind::ExtraTime => self.timer += self.rules.extra_time_seconds,
            PowerUpKind::ExtraLife => self.lives += 1,
            PowerUpKind::FiftyFifty => {
                if !self.narrow_current_question(rng) {
                    return false;
                }
            }
        }

        *self.powerups.count_mut(kind) -= 1;
        true
    }

    pub fn info(&self) -> QuizInfo {
        QuizInfo {
            title: self.quiz.display_title().to_string(),
            questions_count: self.quiz.declared_question_count(),
            max_mistakes: self.scoring.max_mistakes,
            points_per_correct: self.scoring.correct_points,
            points_per_wrong: self.scoring.penalty,
            starting_powerups: self.rules.starting_powerups,
        }
    }

    pub fn snapshot(&self, id: &str) -> SessionSnapshot {
        SessionSnapshot {
            id: id.to_string(),
            phase: self.phase,
            quiz: self.info(),
            question: self.question_view(),
            score: self.score,
            lives: self.lives,
            mistakes: self.mistakes,
            streak: self.streak,
            combo_multiplier: self.combo_multiplier,
            xp: self.xp,
            level: self.level,
            xp_for_next_level: self.rules.xp_threshold(self.level),
            powerups: self.powerups,
            timer_seconds: self.timer,
            selected_answer: self.selected_answer,
            answered_count: self.answered.len(),
            summary: self.results.as_ref().map(QuizResults::summary),
        }
    }

    fn question_view(&self) -> Option<QuestionView> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let question = self.quiz.questions.get(self.current_question)?;
        let total = self.quiz.questions.len();

        Some(QuestionView {
            index: self.current_question,
            number: self.current_question + 1,
            total,
            remaining: total - self.current_question,
            description: question.description.clone(),
            options: self
                .current_options()
                .iter()
                .enumerate()
                .map(|(index, o)| OptionView {
                    index,
                    description: o.description.clone(),
                })
                .collect(),
        })
    }

    fn points_for_correct(&self) -> PointsBreakdown {
        let base = self.scoring.correct_points;
        PointsBreakdown {
            base,
            streak_bonus: if self.streak >= 2 { base * 0.5 } else { 0.0 },
            time_bonus: (self.timer / 10) as f64,
            combo_bonus: base * (self.combo_multiplier - 1.0),
        }
    }

    // Repeats until xp is under the threshold so a large award never skips a
    // level; every level reached grants its own power-ups.
    fn apply_level_ups(&mut self) -> Vec<u32> {
        let mut reached = Vec::new();
        while self.xp >= self.rules.xp_threshold(self.level) {
            self.level += 1;
            self.powerups.grant_one_each();
            reached.push(self.level);
        }
        reached
    }

    fn narrow_current_question<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let options = self.current_options();
        if options.len() <= 2 {
            return false;
        }

        let Some(correct) = options.iter().find(|o| o.is_correct).cloned() else {
            return false;
        };
        let incorrect: Vec<&QuizOption> = options.iter().filter(|o| !o.is_correct).collect();
        let Some(decoy) = incorrect.choose(rng).map(|o| (*o).clone()) else {
            return false;
        };

        let mut pair = vec![correct, decoy];
        pair.shuffle(rng);
        self.narrowed.insert(self.current_question, pair);
        true
    }

    fn finish(&mut self) {
        self.phase = GamePhase::Summary;
        self.results = Some(QuizResults {
            score: self.score,
            answered_questions: self.answered.clone(),
            total_questions: self.quiz.questions.len(),
        });
    }
}
