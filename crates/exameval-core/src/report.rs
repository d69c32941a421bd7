//! Grading report types with JSON persistence and re-grade comparison.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading::AttemptGrading;
use crate::model::{Exam, StudentAnswer};
use crate::statistics::{percentage, ExamStatistics, GradeScale};

/// The result of one batch evaluation run over an exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the exam.
    pub exam: ExamSummary,
    /// Scorer that produced the scores (e.g. "rule-based/flexible").
    pub scorer: String,
    /// One entry per graded attempt, in submission order.
    pub outcomes: Vec<AttemptOutcome>,
    /// Attempts that could not be graded.
    #[serde(default)]
    pub failures: Vec<AttemptFailure>,
    /// Attempts not in `completed` status, left alone.
    #[serde(default)]
    pub skipped: usize,
    /// Aggregate statistics.
    pub statistics: ExamStatistics,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary of an exam (without questions or model answers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub question_count: usize,
    pub total_points: u32,
}

impl From<&Exam> for ExamSummary {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            question_count: exam.questions.len(),
            total_points: exam.total_points(),
        }
    }
}

/// Per-attempt result line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub attempt_id: String,
    pub student_id: String,
    pub total_score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub grade: String,
    /// Answers scored automatically.
    pub auto_scored: usize,
    /// Answers waiting for manual review.
    pub pending: usize,
    pub answers: Vec<StudentAnswer>,
}

impl AttemptOutcome {
    pub fn from_grading(grading: &AttemptGrading, max_score: u32, scale: &GradeScale) -> Self {
        let total_score = grading.total_score();
        let pct = percentage(total_score, max_score);
        Self {
            attempt_id: grading.attempt.id.clone(),
            student_id: grading.attempt.student_id.clone(),
            total_score,
            max_score,
            percentage: pct,
            grade: scale.letter(pct).to_string(),
            auto_scored: grading.auto_scored,
            pending: grading.pending,
            answers: grading.attempt.answers.clone(),
        }
    }
}

/// An attempt the engine could not grade, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub attempt_id: String,
    pub student_id: String,
    pub error: String,
}

impl GradingReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: GradingReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Answers scored automatically across all attempts.
    pub fn auto_scored(&self) -> usize {
        self.outcomes.iter().map(|o| o.auto_scored).sum()
    }

    /// Answers still waiting for manual review across all attempts.
    pub fn pending(&self) -> usize {
        self.outcomes.iter().map(|o| o.pending).sum()
    }

    /// Compare this report against an earlier grading run of the same exam.
    ///
    /// Attempts are matched by id. A change is reported when a total score
    /// moved by at least `threshold` points.
    pub fn compare(&self, baseline: &GradingReport, threshold: u32) -> RegradeReport {
        let baseline_scores: HashMap<&str, &AttemptOutcome> = baseline
            .outcomes
            .iter()
            .map(|o| (o.attempt_id.as_str(), o))
            .collect();

        let mut raised = Vec::new();
        let mut lowered = Vec::new();
        let mut unchanged = 0usize;
        let mut new_attempts = 0usize;

        for current in &self.outcomes {
            let Some(previous) = baseline_scores.get(current.attempt_id.as_str()) else {
                new_attempts += 1;
                continue;
            };
            let delta = current.total_score as i64 - previous.total_score as i64;
            if delta.unsigned_abs() < threshold.max(1) as u64 {
                unchanged += 1;
                continue;
            }
            let change = ScoreChange {
                attempt_id: current.attempt_id.clone(),
                student_id: current.student_id.clone(),
                baseline_score: previous.total_score,
                current_score: current.total_score,
                delta,
                baseline_grade: previous.grade.clone(),
                current_grade: current.grade.clone(),
            };
            if delta < 0 {
                lowered.push(change);
            } else {
                raised.push(change);
            }
        }

        let removed_attempts = baseline
            .outcomes
            .iter()
            .filter(|b| !self.outcomes.iter().any(|c| c.attempt_id == b.attempt_id))
            .count();

        RegradeReport {
            raised,
            lowered,
            unchanged,
            new_attempts,
            removed_attempts,
        }
    }
}

/// Result of comparing two grading runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegradeReport {
    /// Attempts whose total went up.
    pub raised: Vec<ScoreChange>,
    /// Attempts whose total went down.
    pub lowered: Vec<ScoreChange>,
    /// Attempts with no significant change.
    pub unchanged: usize,
    /// Attempts in current but not baseline.
    pub new_attempts: usize,
    /// Attempts in baseline but not current.
    pub removed_attempts: usize,
}

/// A total score that moved between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreChange {
    pub attempt_id: String,
    pub student_id: String,
    pub baseline_score: u32,
    pub current_score: u32,
    pub delta: i64,
    pub baseline_grade: String,
    pub current_grade: String,
}

impl RegradeReport {
    /// Format the comparison as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} raised, {} lowered, {} unchanged\n\n",
            self.raised.len(),
            self.lowered.len(),
            self.unchanged
        ));

        for (title, changes) in [("Lowered", &self.lowered), ("Raised", &self.raised)] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Student | Attempt | Baseline | Current | Delta |\n");
            md.push_str("|---------|---------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {} | {} ({}) | {} ({}) | {:+} |\n",
                    c.student_id,
                    c.attempt_id,
                    c.baseline_score,
                    c.baseline_grade,
                    c.current_score,
                    c.current_grade,
                    c.delta
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Returns true if any attempt lost points.
    pub fn has_lowered(&self) -> bool {
        !self.lowered.is_empty()
    }
}
