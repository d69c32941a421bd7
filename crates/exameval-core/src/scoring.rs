//! Rule-based answer scoring.
//!
//! Maps one (question, student answer, model answer) triple to a score in
//! `[0, points]` and a feedback message. Pure and deterministic: the same
//! inputs and mode always produce the same evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::model::{option_letter, ModelAnswer, Question, QuestionType, StudentAnswer};
use crate::traits::AnswerScorer;

/// Below this many characters a long answer earns the minimum share.
pub const LONG_ANSWER_MIN_CHARS: usize = 50;
/// At or above this many characters a long answer earns the maximum share.
pub const LONG_ANSWER_TARGET_CHARS: usize = 200;

const LONG_ANSWER_MIN_SHARE: f64 = 0.1;
const LONG_ANSWER_MAX_SHARE: f64 = 0.7;
const LONG_ANSWER_SPAN_SHARE: f64 = 0.6;

/// Model-answer tokens this short never count as matches.
const MIN_KEY_TERM_CHARS: usize = 3;

/// How free-text answers are matched against the model answer.
///
/// Multiple-choice questions are always exact-match regardless of mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMode {
    /// Exact match only; long answers are left at zero for manual grading.
    #[default]
    Strict,
    /// Partial credit from key-term overlap (short) or length (long).
    Flexible,
}

impl fmt::Display for MatchingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchingMode::Strict => write!(f, "strict"),
            MatchingMode::Flexible => write!(f, "flexible"),
        }
    }
}

impl FromStr for MatchingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(MatchingMode::Strict),
            "flexible" => Ok(MatchingMode::Flexible),
            other => Err(format!(
                "unknown matching mode: {other} (expected 'strict' or 'flexible')"
            )),
        }
    }
}

/// Outcome of scoring a single answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u32,
    pub feedback: String,
}

impl Evaluation {
    fn new(score: u32, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }

    /// Append the model answer's explanation as a trailing sentence.
    fn with_explanation(mut self, model_answer: &ModelAnswer) -> Self {
        if let Some(explanation) = model_answer
            .explanation
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        {
            self.feedback.push(' ');
            self.feedback.push_str(explanation);
        }
        self
    }

    /// Write score and feedback onto a student answer.
    pub fn apply_to(self, answer: &mut StudentAnswer) {
        answer.score = Some(self.score);
        answer.feedback = Some(self.feedback);
    }
}

/// Score one answer.
///
/// Returns `Ok(None)` when the answer cannot be auto-graded: there is no
/// model answer, or the question type is manual-only. Structurally invalid
/// questions are an error naming the question id.
pub fn evaluate(
    question: &Question,
    answer: &StudentAnswer,
    model_answer: Option<&ModelAnswer>,
    mode: MatchingMode,
) -> Result<Option<Evaluation>, EvaluationError> {
    question.ensure_gradable()?;

    if !question.question_type.is_auto_gradable() {
        tracing::debug!(question_id = %question.id, "manual-only question type, left unscored");
        return Ok(None);
    }

    let Some(model_answer) = model_answer else {
        tracing::debug!(question_id = %question.id, "no model answer, left for manual review");
        return Ok(None);
    };

    let evaluation = match question.question_type {
        QuestionType::MultipleChoice => score_multiple_choice(question, answer, model_answer)?,
        QuestionType::ShortAnswer => match mode {
            MatchingMode::Strict => score_short_answer_strict(question, answer, model_answer),
            MatchingMode::Flexible => score_short_answer_flexible(question, answer, model_answer),
        },
        QuestionType::LongAnswer => match mode {
            MatchingMode::Strict => {
                Evaluation::new(0, "This answer requires manual evaluation.")
            }
            MatchingMode::Flexible => score_long_answer_by_length(question, answer),
        },
        QuestionType::PdfUpload => return Ok(None),
    }
    .with_explanation(model_answer);

    tracing::debug!(
        question_id = %question.id,
        score = evaluation.score,
        points = question.points,
        %mode,
        "answer evaluated"
    );

    Ok(Some(evaluation))
}

fn score_multiple_choice(
    question: &Question,
    answer: &StudentAnswer,
    model_answer: &ModelAnswer,
) -> Result<Evaluation, EvaluationError> {
    let expected = question.expected_choice(model_answer)?;

    if answer.answer.as_choice() == Some(expected) {
        Ok(Evaluation::new(question.points, "Correct answer"))
    } else {
        Ok(Evaluation::new(
            0,
            format!(
                "Incorrect. The correct answer is option {}.",
                option_letter(expected)
            ),
        ))
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn score_short_answer_strict(
    question: &Question,
    answer: &StudentAnswer,
    model_answer: &ModelAnswer,
) -> Evaluation {
    let student = normalize(&answer.answer.to_string());
    let expected = normalize(&model_answer.answer.to_string());

    if student == expected {
        Evaluation::new(question.points, "Correct answer")
    } else {
        Evaluation::new(0, format!("Incorrect. Expected: {}", model_answer.answer))
    }
}

/// Fraction of model-answer tokens found in the student answer.
///
/// Tokens of three characters or fewer never match but still count towards
/// the total.
pub fn key_term_match_ratio(student_answer: &str, model_answer: &str) -> f64 {
    let student = normalize(student_answer);
    let model = normalize(model_answer);

    let terms: Vec<&str> = model.split_whitespace().collect();
    if terms.is_empty() {
        return 0.0;
    }

    let matched = terms
        .iter()
        .filter(|term| term.chars().count() > MIN_KEY_TERM_CHARS && student.contains(**term))
        .count();

    matched as f64 / terms.len() as f64
}

fn score_short_answer_flexible(
    question: &Question,
    answer: &StudentAnswer,
    model_answer: &ModelAnswer,
) -> Evaluation {
    let ratio = key_term_match_ratio(
        &answer.answer.to_string(),
        &model_answer.answer.to_string(),
    );

    if ratio > 0.8 {
        Evaluation::new(question.points, "Correct answer")
    } else if ratio > 0.5 {
        Evaluation::new(share(question.points, 0.7), "Partially correct answer")
    } else if ratio > 0.3 {
        Evaluation::new(
            share(question.points, 0.3),
            "Some correct elements, but incomplete",
        )
    } else {
        Evaluation::new(0, format!("Incorrect. Expected: {}", model_answer.answer))
    }
}

/// Provisional score for a long answer from its character count alone.
///
/// `length` is in Unicode scalar values (`str::chars().count()`).
pub fn long_answer_length_score(points: u32, length: usize) -> u32 {
    if length < LONG_ANSWER_MIN_CHARS {
        share(points, LONG_ANSWER_MIN_SHARE)
    } else if length >= LONG_ANSWER_TARGET_CHARS {
        share(points, LONG_ANSWER_MAX_SHARE)
    } else {
        let ratio = (length - LONG_ANSWER_MIN_CHARS) as f64
            / (LONG_ANSWER_TARGET_CHARS - LONG_ANSWER_MIN_CHARS) as f64;
        let p = points as f64;
        let raw = p * LONG_ANSWER_MIN_SHARE
            + p * LONG_ANSWER_SPAN_SHARE * ratio;
        (raw.round() as u32).min(points)
    }
}

fn score_long_answer_by_length(question: &Question, answer: &StudentAnswer) -> Evaluation {
    let length = answer.answer.to_string().chars().count();
    let score = long_answer_length_score(question.points, length);

    let feedback = if length < LONG_ANSWER_MIN_CHARS {
        "Provisional score: response too short for automated evaluation. Needs manual review."
    } else if length >= LONG_ANSWER_TARGET_CHARS {
        "Provisional score: length criteria met. Content needs manual verification."
    } else {
        "Provisional score: partial automated score based on length. Needs manual review."
    };

    Evaluation::new(score, feedback)
}

fn share(points: u32, fraction: f64) -> u32 {
    ((points as f64 * fraction).round() as u32).min(points)
}

/// The built-in scorer: the rules above under a fixed matching mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedScorer {
    mode: MatchingMode,
}

impl RuleBasedScorer {
    pub fn new(mode: MatchingMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchingMode {
        self.mode
    }
}

impl AnswerScorer for RuleBasedScorer {
    fn name(&self) -> &str {
        match self.mode {
            MatchingMode::Strict => "rule-based/strict",
            MatchingMode::Flexible => "rule-based/flexible",
        }
    }

    fn score(
        &self,
        question: &Question,
        answer: &StudentAnswer,
        model_answer: Option<&ModelAnswer>,
    ) -> Result<Option<Evaluation>, EvaluationError> {
        evaluate(question, answer, model_answer, self.mode)
    }
}
