//! Core data model types for exameval.
//!
//! Exams, questions, instructor-supplied model answers, and student attempts.
//! Everything here is plain data; scoring lives in [`crate::scoring`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EvaluationError;

/// The kind of prompt a question presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    LongAnswer,
    /// Answered by uploading a document. Never auto-graded.
    PdfUpload,
}

impl QuestionType {
    /// Whether the rule-based scorer can produce a score for this type.
    pub fn is_auto_gradable(&self) -> bool {
        !matches!(self, QuestionType::PdfUpload)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple-choice"),
            QuestionType::ShortAnswer => write!(f, "short-answer"),
            QuestionType::LongAnswer => write!(f, "long-answer"),
            QuestionType::PdfUpload => write!(f, "pdf-upload"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "multiple-choice" | "mcq" => Ok(QuestionType::MultipleChoice),
            "short-answer" | "short" => Ok(QuestionType::ShortAnswer),
            "long-answer" | "long" | "essay" => Ok(QuestionType::LongAnswer),
            "pdf-upload" | "pdf" => Ok(QuestionType::PdfUpload),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// An answer value: either the index of a chosen option or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Choice(usize),
    Text(String),
}

impl AnswerValue {
    pub fn as_choice(&self) -> Option<usize> {
        match self {
            AnswerValue::Choice(index) => Some(*index),
            AnswerValue::Text(_) => None,
        }
    }

    /// Empty text counts as "not answered".
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Choice(_) => false,
            AnswerValue::Text(text) => text.trim().is_empty(),
        }
    }
}

impl Default for AnswerValue {
    fn default() -> Self {
        AnswerValue::Text(String::new())
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Choice(index) => write!(f, "{index}"),
            AnswerValue::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<usize> for AnswerValue {
    fn from(index: usize) -> Self {
        AnswerValue::Choice(index)
    }
}

impl From<&str> for AnswerValue {
    fn from(text: &str) -> Self {
        AnswerValue::Text(text.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(text: String) -> Self {
        AnswerValue::Text(text)
    }
}

/// Render an option index as a letter: 0 → `A`, 1 → `B`, …
///
/// Indexes past `Z` fall back to the 1-based number.
pub fn option_letter(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        (index + 1).to_string()
    }
}

/// One exam prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique within an exam.
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Prompt text.
    #[serde(default)]
    pub content: String,
    /// Ordered choices; only meaningful for multiple-choice.
    #[serde(default)]
    pub options: Vec<String>,
    /// Index into `options` for multiple-choice, text otherwise.
    #[serde(default)]
    pub correct_answer: Option<AnswerValue>,
    /// Maximum obtainable score.
    pub points: u32,
}

impl Question {
    /// Check that this question can be scored at all.
    ///
    /// Authoring validation reports the same problems as warnings; grading
    /// refuses to guess and fails with the question id instead.
    pub fn ensure_gradable(&self) -> Result<(), EvaluationError> {
        if self.points == 0 {
            return Err(EvaluationError::malformed(
                &self.id,
                "points must be a positive integer",
            ));
        }
        if self.question_type == QuestionType::MultipleChoice && self.options.is_empty() {
            return Err(EvaluationError::malformed(
                &self.id,
                "multiple-choice question has no options",
            ));
        }
        Ok(())
    }

    /// The option index a multiple-choice model answer points at.
    ///
    /// Reference answers are index-only; text or out-of-range values are a
    /// data-integrity fault rather than something to guess at.
    pub fn expected_choice(&self, model_answer: &ModelAnswer) -> Result<usize, EvaluationError> {
        let expected = model_answer.answer.as_choice().ok_or_else(|| {
            EvaluationError::malformed(&self.id, "model answer must be an option index")
        })?;
        if expected >= self.options.len() {
            return Err(EvaluationError::malformed(
                &self.id,
                format!(
                    "model answer index {expected} is out of range for {} options",
                    self.options.len()
                ),
            ));
        }
        Ok(expected)
    }
}

/// Instructor-supplied reference answer, stored apart from the question so the
/// grading criteria can be edited on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAnswer {
    pub question_id: String,
    pub answer: AnswerValue,
    /// Appended to every generated feedback message when non-empty.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A student's response to one question within one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswer {
    pub question_id: String,
    #[serde(default)]
    pub answer: AnswerValue,
    #[serde(default)]
    pub marked_for_review: bool,
    /// Populated by grading; `None` means pending manual review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl StudentAnswer {
    pub fn new(question_id: impl Into<String>, answer: impl Into<AnswerValue>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            marked_for_review: false,
            score: None,
            feedback: None,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }
}

/// Attempt lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Graded,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::InProgress => write!(f, "in-progress"),
            AttemptStatus::Completed => write!(f, "completed"),
            AttemptStatus::Graded => write!(f, "graded"),
        }
    }
}

/// One student's run through an exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttempt {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: AttemptStatus,
    #[serde(default)]
    pub answers: Vec<StudentAnswer>,
    /// Sum of answer scores; set only when graded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u32>,
}

impl ExamAttempt {
    /// Open a new attempt with one empty answer per question.
    pub fn start(exam: &Exam, student_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            exam_id: exam.id.clone(),
            student_id: student_id.into(),
            start_time: Utc::now(),
            end_time: None,
            status: AttemptStatus::InProgress,
            answers: exam
                .questions
                .iter()
                .map(|q| StudentAnswer::new(q.id.clone(), AnswerValue::default()))
                .collect(),
            total_score: None,
        }
    }

    /// Record (or replace) the answer to a question while the attempt is open.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        answer: impl Into<AnswerValue>,
    ) -> Result<(), EvaluationError> {
        if self.status != AttemptStatus::InProgress {
            return Err(EvaluationError::InvalidTransition {
                attempt_id: self.id.clone(),
                from: self.status,
                to: AttemptStatus::InProgress,
            });
        }
        let answer = answer.into();
        match self.answers.iter_mut().find(|a| a.question_id == question_id) {
            Some(existing) => existing.answer = answer,
            None => self.answers.push(StudentAnswer::new(question_id, answer)),
        }
        Ok(())
    }

    /// Hand the attempt in: `in-progress → completed`.
    pub fn submit(&mut self) -> Result<(), EvaluationError> {
        self.transition(AttemptStatus::Completed)?;
        self.end_time = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn transition(&mut self, to: AttemptStatus) -> Result<(), EvaluationError> {
        let allowed = matches!(
            (self.status, to),
            (AttemptStatus::InProgress, AttemptStatus::Completed)
                | (AttemptStatus::Completed, AttemptStatus::Graded)
        );
        if !allowed {
            return Err(EvaluationError::InvalidTransition {
                attempt_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// A complete exam: questions plus the model answers used to grade them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub model_answers: Vec<ModelAnswer>,
}

impl Exam {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn model_answer(&self, question_id: &str) -> Option<&ModelAnswer> {
        self.model_answers
            .iter()
            .find(|m| m.question_id == question_id)
    }

    /// Maximum obtainable score across all questions.
    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }

    /// Fail on the first question that cannot be graded, including
    /// multiple-choice questions whose model answer is not a valid index.
    pub fn ensure_gradable(&self) -> Result<(), EvaluationError> {
        for question in &self.questions {
            question.ensure_gradable()?;
            if question.question_type == QuestionType::MultipleChoice {
                if let Some(model_answer) = self.model_answer(&question.id) {
                    question.expected_choice(model_answer)?;
                }
            }
        }
        Ok(())
    }
}
