use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_TITLE: &str = "Quiz Challenge";
pub const DEFAULT_CORRECT_MARKS: f64 = 4.0;
pub const DEFAULT_NEGATIVE_MARKS: f64 = 1.0;
pub const DEFAULT_MAX_MISTAKES: u32 = 3;

/// Quiz document as served by the upstream source.
///
/// Only the fields the game uses are modelled; everything else in the upstream
/// document is ignored here and passed through untouched by the proxy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub questions_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub max_mistake_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub correct_answer_marks: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub negative_marks: Option<f64>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub description: String,
    #[serde(default)]
    pub detailed_solution: Option<String>,
    #[serde(default)]
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizOption {
    pub description: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Scoring parameters resolved from a quiz document.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ScoringParams {
    pub correct_points: f64,
    pub penalty: f64,
    pub max_mistakes: u32,
}

impl Quiz {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TITLE)
    }

    /// Missing, unparseable and zero values fall back to the defaults.
    pub fn scoring(&self) -> ScoringParams {
        let usable = |v: &f64| v.is_finite() && *v != 0.0;

        ScoringParams {
            correct_points: self
                .correct_answer_marks
                .filter(usable)
                .unwrap_or(DEFAULT_CORRECT_MARKS),
            penalty: self
                .negative_marks
                .filter(usable)
                .unwrap_or(DEFAULT_NEGATIVE_MARKS),
            max_mistakes: self
                .max_mistake_count
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_MAX_MISTAKES),
        }
    }

    pub fn declared_question_count(&self) -> u32 {
        self.questions_count
            .unwrap_or(self.questions.len() as u32)
    }
}

impl Question {
    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrString>::deserialize(deserializer).unwrap_or(None);
    Ok(match raw {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u32))
}
