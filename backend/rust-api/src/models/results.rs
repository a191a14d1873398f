use serde::{Deserialize, Serialize};

/// One entry of the solutions list. The field names match what the results
/// view reads from storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
    pub question: String,
    pub user_answer: Option<String>,
    pub correct: bool,
    pub solution: Option<String>,
    pub points: f64,
}

/// Record written to the last-results slot when a session ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizResults {
    pub score: f64,
    pub answered_questions: Vec<AnsweredQuestion>,
    pub total_questions: usize,
}

impl QuizResults {
    pub fn correct_count(&self) -> usize {
        self.answered_questions.iter().filter(|q| q.correct).count()
    }

    pub fn accuracy_percent(&self) -> u32 {
        percent(self.correct_count(), self.total_questions)
    }

    pub fn completion_percent(&self) -> u32 {
        percent(self.answered_questions.len(), self.total_questions)
    }

    pub fn summary(&self) -> ResultsSummary {
        ResultsSummary {
            correct_answers: self.correct_count(),
            answered: self.answered_questions.len(),
            total_questions: self.total_questions,
            accuracy_percent: self.accuracy_percent(),
            completion_percent: self.completion_percent(),
        }
    }
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsSummary {
    pub correct_answers: usize,
    pub answered: usize,
    pub total_questions: usize,
    pub accuracy_percent: u32,
    pub completion_percent: u32,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    #[serde(flatten)]
    pub results: QuizResults,
    pub summary: ResultsSummary,
}
