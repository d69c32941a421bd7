//! Core trait definitions for answer scorers and exam storage.
//!
//! The rule-based scorer and the in-memory repository are the built-in
//! implementations; callers plug in their own at the same seams.

use async_trait::async_trait;

use crate::error::EvaluationError;
use crate::model::{Exam, ExamAttempt, ModelAnswer, Question, StudentAnswer};
use crate::scoring::Evaluation;

// ---------------------------------------------------------------------------
// Answer scorer trait
// ---------------------------------------------------------------------------

/// Scores one answer against its reference.
///
/// Implementations must be deterministic: the same inputs always produce the
/// same evaluation. Semantic or model-assisted matching belongs behind this
/// trait, not inside the rule-based scorer.
pub trait AnswerScorer: Send + Sync {
    /// Short name recorded in reports (e.g. "rule-based/strict").
    fn name(&self) -> &str;

    /// Score an answer. `Ok(None)` leaves it pending manual review.
    fn score(
        &self,
        question: &Question,
        answer: &StudentAnswer,
        model_answer: Option<&ModelAnswer>,
    ) -> Result<Option<Evaluation>, EvaluationError>;
}

// ---------------------------------------------------------------------------
// Exam repository trait
// ---------------------------------------------------------------------------

/// Source of exams and sink for graded attempts.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Look up an exam with its questions and model answers.
    async fn get_exam(&self, exam_id: &str) -> anyhow::Result<Option<Exam>>;

    /// All attempts submitted against an exam, in submission order.
    async fn list_attempts(&self, exam_id: &str) -> anyhow::Result<Vec<ExamAttempt>>;

    /// Insert or replace an attempt by id.
    async fn save_attempt(&self, attempt: &ExamAttempt) -> anyhow::Result<()>;
}
