//! Evaluation error types.
//!
//! A question without a model answer is not an error: it comes back
//! unscored. Only structurally broken data and lifecycle misuse end up here.

use thiserror::Error;

use crate::model::AttemptStatus;

/// Errors raised while grading.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The question (or its reference answer) cannot be graded as authored.
    #[error("malformed question '{question_id}': {reason}")]
    MalformedQuestion { question_id: String, reason: String },

    /// An attempt was asked to move to a status it cannot reach.
    #[error("attempt '{attempt_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        attempt_id: String,
        from: AttemptStatus,
        to: AttemptStatus,
    },

    /// The repository has no exam with this id.
    #[error("exam not found: {0}")]
    ExamNotFound(String),
}

impl EvaluationError {
    pub(crate) fn malformed(question_id: &str, reason: impl Into<String>) -> Self {
        EvaluationError::MalformedQuestion {
            question_id: question_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the offending question id for data-integrity faults.
    pub fn question_id(&self) -> Option<&str> {
        match self {
            EvaluationError::MalformedQuestion { question_id, .. } => Some(question_id),
            _ => None,
        }
    }
}
