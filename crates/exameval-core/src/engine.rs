//! Batch evaluation engine.
//!
//! Grades every completed attempt of an exam with bounded parallelism,
//! writes graded attempts back through the repository, and aggregates the
//! outcome into a [`GradingReport`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::EvaluationError;
use crate::grading::{grade_attempt, AttemptGrading};
use crate::model::{AttemptStatus, ExamAttempt};
use crate::report::{AttemptFailure, AttemptOutcome, ExamSummary, GradingReport};
use crate::statistics::{compute_exam_statistics, GradeScale};
use crate::traits::{AnswerScorer, ExamRepository};

/// Configuration for the evaluation engine.
#[derive(Debug, Clone)]
pub struct EvaluationEngineConfig {
    /// Maximum attempts graded concurrently.
    pub parallelism: usize,
    /// Letter-grade thresholds used in outcomes and statistics.
    pub grade_scale: GradeScale,
}

impl Default for EvaluationEngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            grade_scale: GradeScale::default(),
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_attempt_start(&self, attempt_id: &str, student_id: &str);
    fn on_attempt_graded(&self, grading: &AttemptGrading);
    fn on_attempt_error(&self, attempt_id: &str, student_id: &str, error: &str);
    fn on_run_complete(&self, total: usize, graded: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_attempt_start(&self, _: &str, _: &str) {}
    fn on_attempt_graded(&self, _: &AttemptGrading) {}
    fn on_attempt_error(&self, _: &str, _: &str, _: &str) {}
    fn on_run_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// The batch evaluation engine.
pub struct EvaluationEngine {
    repository: Arc<dyn ExamRepository>,
    scorer: Arc<dyn AnswerScorer>,
    config: EvaluationEngineConfig,
}

impl EvaluationEngine {
    pub fn new(
        repository: Arc<dyn ExamRepository>,
        scorer: Arc<dyn AnswerScorer>,
        config: EvaluationEngineConfig,
    ) -> Self {
        Self {
            repository,
            scorer,
            config,
        }
    }

    /// Grade every completed attempt of an exam.
    ///
    /// Fails before grading anything if the exam is missing or any of its
    /// questions is malformed. Individual attempt failures are recorded in
    /// the report and do not stop the run.
    pub async fn run(&self, exam_id: &str, progress: &dyn ProgressReporter) -> Result<GradingReport> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        let exam = self
            .repository
            .get_exam(exam_id)
            .await?
            .ok_or_else(|| EvaluationError::ExamNotFound(exam_id.to_string()))?;
        exam.ensure_gradable()?;

        let attempts = self.repository.list_attempts(exam_id).await?;
        let (pending, others): (Vec<ExamAttempt>, Vec<ExamAttempt>) = attempts
            .into_iter()
            .partition(|a| a.status == AttemptStatus::Completed);
        for attempt in &others {
            tracing::debug!(
                attempt_id = %attempt.id,
                status = %attempt.status,
                "skipping attempt that is not awaiting grading"
            );
        }

        tracing::info!(
            %run_id,
            exam_id,
            scorer = self.scorer.name(),
            attempts = pending.len(),
            skipped = others.len(),
            "starting evaluation run"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let exam_ref = &exam;
        let scorer = self.scorer.as_ref();
        let repository = self.repository.as_ref();

        let mut futures = FuturesUnordered::new();
        for (index, attempt) in pending.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                let inner = async {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                    progress.on_attempt_start(&attempt.id, &attempt.student_id);

                    let grading = grade_attempt(attempt, exam_ref, scorer)?;
                    repository.save_attempt(&grading.attempt).await?;
                    Ok::<_, anyhow::Error>(grading)
                };
                (index, attempt, inner.await)
            });
        }

        let total = futures.len();
        let mut gradings: Vec<(usize, AttemptGrading)> = Vec::with_capacity(total);
        let mut failures = Vec::new();

        while let Some((index, attempt, result)) = futures.next().await {
            match result {
                Ok(grading) => {
                    progress.on_attempt_graded(&grading);
                    gradings.push((index, grading));
                }
                Err(e) => {
                    tracing::error!("grading failed for attempt {}: {e:#}", attempt.id);
                    progress.on_attempt_error(&attempt.id, &attempt.student_id, &e.to_string());
                    failures.push((
                        index,
                        AttemptFailure {
                            attempt_id: attempt.id.clone(),
                            student_id: attempt.student_id.clone(),
                            error: format!("{e:#}"),
                        },
                    ));
                }
            }
        }

        // Completion order is arbitrary; report in submission order.
        gradings.sort_by_key(|(index, _)| *index);
        failures.sort_by_key(|(index, _)| *index);
        let gradings: Vec<AttemptGrading> = gradings.into_iter().map(|(_, g)| g).collect();
        let failures: Vec<AttemptFailure> = failures.into_iter().map(|(_, f)| f).collect();

        let elapsed = start.elapsed();
        progress.on_run_complete(total, gradings.len(), failures.len(), elapsed);

        let max_score = exam.total_points();
        let scale = &self.config.grade_scale;
        let outcomes = gradings
            .iter()
            .map(|g| AttemptOutcome::from_grading(g, max_score, scale))
            .collect();
        let statistics = compute_exam_statistics(&exam, &gradings, scale);

        tracing::info!(
            %run_id,
            graded = gradings.len(),
            failed = failures.len(),
            pending_answers = statistics.pending_answers,
            "evaluation run complete"
        );

        Ok(GradingReport {
            id: run_id,
            created_at: chrono::Utc::now(),
            exam: ExamSummary::from(&exam),
            scorer: self.scorer.name().to_string(),
            outcomes,
            failures,
            skipped: others.len(),
            statistics,
            duration_ms: elapsed.as_millis() as u64,
        })
    }
}
