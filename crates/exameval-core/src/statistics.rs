//! Percentages, letter grades, and per-exam aggregate statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grading::AttemptGrading;
use crate::model::Exam;

/// `score / max` as a whole percentage, rounded to nearest.
pub fn percentage(score: u32, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    (score as f64 / max as f64 * 100.0).round() as u32
}

/// Minimum percentage for each letter grade; anything below `d` is an F.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeScale {
    #[serde(default = "default_a")]
    pub a: u32,
    #[serde(default = "default_b")]
    pub b: u32,
    #[serde(default = "default_c")]
    pub c: u32,
    #[serde(default = "default_d")]
    pub d: u32,
}

fn default_a() -> u32 {
    90
}
fn default_b() -> u32 {
    80
}
fn default_c() -> u32 {
    70
}
fn default_d() -> u32 {
    60
}

impl Default for GradeScale {
    fn default() -> Self {
        Self {
            a: default_a(),
            b: default_b(),
            c: default_c(),
            d: default_d(),
        }
    }
}

impl GradeScale {
    /// Letter grade for a whole percentage.
    pub fn letter(&self, percent: u32) -> &'static str {
        if percent >= self.a {
            "A"
        } else if percent >= self.b {
            "B"
        } else if percent >= self.c {
            "C"
        } else if percent >= self.d {
            "D"
        } else {
            "F"
        }
    }

    /// Thresholds must be non-increasing from A to D.
    pub fn is_ordered(&self) -> bool {
        self.a >= self.b && self.b >= self.c && self.c >= self.d
    }
}

/// Aggregate statistics over the graded attempts of one exam.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamStatistics {
    /// Number of graded attempts.
    pub graded_attempts: usize,
    /// Maximum obtainable score.
    pub max_score: u32,
    pub mean_score: f64,
    pub highest_score: u32,
    pub lowest_score: u32,
    pub mean_percentage: f64,
    /// Attempts per letter grade.
    pub grade_distribution: BTreeMap<String, usize>,
    /// Answers across all attempts still waiting for manual review.
    pub pending_answers: usize,
    /// Per-question breakdown, in exam order.
    pub per_question: Vec<QuestionStats>,
}

/// How one question fared across all graded attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_id: String,
    pub points: u32,
    /// Answers that received a score.
    pub scored: usize,
    /// Answers left for manual review.
    pub pending: usize,
    /// Mean over scored answers only.
    pub mean_score: f64,
    /// Scored answers that earned full points.
    pub full_marks: usize,
}

/// Compute statistics from a batch of gradings.
pub fn compute_exam_statistics(
    exam: &Exam,
    gradings: &[AttemptGrading],
    scale: &GradeScale,
) -> ExamStatistics {
    let max_score = exam.total_points();
    if gradings.is_empty() {
        return ExamStatistics {
            max_score,
            per_question: exam
                .questions
                .iter()
                .map(|q| QuestionStats {
                    question_id: q.id.clone(),
                    points: q.points,
                    scored: 0,
                    pending: 0,
                    mean_score: 0.0,
                    full_marks: 0,
                })
                .collect(),
            ..Default::default()
        };
    }

    let totals: Vec<u32> = gradings.iter().map(AttemptGrading::total_score).collect();
    let n = totals.len() as f64;

    let mut grade_distribution = BTreeMap::new();
    let mut percentage_sum = 0.0;
    for &total in &totals {
        let pct = percentage(total, max_score);
        percentage_sum += pct as f64;
        *grade_distribution
            .entry(scale.letter(pct).to_string())
            .or_insert(0) += 1;
    }

    let per_question = exam
        .questions
        .iter()
        .map(|q| {
            let answers: Vec<_> = gradings
                .iter()
                .flat_map(|g| g.attempt.answers.iter())
                .filter(|a| a.question_id == q.id)
                .collect();
            let scores: Vec<u32> = answers.iter().filter_map(|a| a.score).collect();
            let mean_score = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<u32>() as f64 / scores.len() as f64
            };
            QuestionStats {
                question_id: q.id.clone(),
                points: q.points,
                scored: scores.len(),
                pending: answers.len() - scores.len(),
                mean_score,
                full_marks: scores.iter().filter(|&&s| s == q.points).count(),
            }
        })
        .collect();

    ExamStatistics {
        graded_attempts: gradings.len(),
        max_score,
        mean_score: totals.iter().sum::<u32>() as f64 / n,
        highest_score: totals.iter().copied().max().unwrap_or(0),
        lowest_score: totals.iter().copied().min().unwrap_or(0),
        mean_percentage: percentage_sum / n,
        grade_distribution,
        pending_answers: gradings.iter().map(|g| g.pending).sum(),
        per_question,
    }
}
