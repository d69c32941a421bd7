//! Grading a whole attempt.
//!
//! Every answer is scored on its own; an answer that cannot be auto-graded
//! stays unscored and is counted as pending instead of failing the attempt.

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::model::{AttemptStatus, Exam, ExamAttempt};
use crate::traits::AnswerScorer;

/// A graded attempt and how much of it still needs a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptGrading {
    pub attempt: ExamAttempt,
    /// Answers that received a score.
    pub auto_scored: usize,
    /// Answers left unscored for manual review.
    pub pending: usize,
}

impl AttemptGrading {
    pub fn total_score(&self) -> u32 {
        self.attempt.total_score.unwrap_or(0)
    }

    pub fn needs_manual_review(&self) -> bool {
        self.pending > 0
    }
}

/// Score every answer of a completed attempt and mark it graded.
///
/// The input attempt is left untouched. Fails without grading anything if the
/// attempt is not `completed` or if any answered question is malformed.
pub fn grade_attempt(
    attempt: &ExamAttempt,
    exam: &Exam,
    scorer: &dyn AnswerScorer,
) -> Result<AttemptGrading, EvaluationError> {
    let mut graded = attempt.clone();
    graded.transition(AttemptStatus::Graded)?;

    if attempt.exam_id != exam.id {
        tracing::warn!(
            attempt_id = %attempt.id,
            attempt_exam = %attempt.exam_id,
            exam = %exam.id,
            "attempt was submitted against a different exam id"
        );
    }

    let mut auto_scored = 0;
    let mut pending = 0;

    for answer in &mut graded.answers {
        let Some(question) = exam.question(&answer.question_id) else {
            tracing::warn!(
                attempt_id = %attempt.id,
                question_id = %answer.question_id,
                "answer references a question not in the exam, left unscored"
            );
            answer.score = None;
            answer.feedback = None;
            pending += 1;
            continue;
        };

        match scorer.score(question, answer, exam.model_answer(&question.id))? {
            Some(mut evaluation) => {
                if evaluation.score > question.points {
                    tracing::warn!(
                        attempt_id = %attempt.id,
                        question_id = %question.id,
                        scorer = scorer.name(),
                        score = evaluation.score,
                        points = question.points,
                        "score exceeds question points, clamped"
                    );
                    evaluation.score = question.points;
                }
                evaluation.apply_to(answer);
                auto_scored += 1;
            }
            None => {
                answer.score = None;
                answer.feedback = None;
                pending += 1;
            }
        }
    }

    let total: u32 = graded.answers.iter().filter_map(|a| a.score).sum();
    graded.total_score = Some(total);
    let blank = graded.answers.iter().filter(|a| a.answer.is_blank()).count();

    tracing::debug!(
        attempt_id = %graded.id,
        scorer = scorer.name(),
        total,
        auto_scored,
        pending,
        blank,
        "attempt graded"
    );

    Ok(AttemptGrading {
        attempt: graded,
        auto_scored,
        pending,
    })
}
