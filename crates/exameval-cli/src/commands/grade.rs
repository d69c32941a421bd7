//! The `exameval grade` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use exameval_core::engine::{EvaluationEngine, EvaluationEngineConfig, ProgressReporter};
use exameval_core::grading::AttemptGrading;
use exameval_core::parser;
use exameval_core::report::GradingReport;
use exameval_core::repository::InMemoryRepository;
use exameval_core::scoring::{MatchingMode, RuleBasedScorer};
use exameval_core::traits::ExamRepository;

use crate::config::load_config_from;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_attempt_start(&self, attempt_id: &str, student_id: &str) {
        eprintln!("  Grading: {student_id} ({attempt_id})");
    }

    fn on_attempt_graded(&self, grading: &AttemptGrading) {
        let review = if grading.needs_manual_review() {
            format!(", {} pending review", grading.pending)
        } else {
            String::new()
        };
        eprintln!(
            "  Done: {} scored {} ({} auto-scored{})",
            grading.attempt.student_id,
            grading.total_score(),
            grading.auto_scored,
            review,
        );
    }

    fn on_attempt_error(&self, attempt_id: &str, student_id: &str, error: &str) {
        eprintln!("  ERROR: {student_id} ({attempt_id}): {error}");
    }

    fn on_run_complete(&self, total: usize, graded: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {graded}/{total} graded, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    exam_path: PathBuf,
    attempts_path: PathBuf,
    mode: Option<String>,
    parallelism: Option<usize>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mode: MatchingMode = match mode {
        Some(m) => m.parse().map_err(|e: String| anyhow::anyhow!("{e}"))?,
        None => config.default_mode,
    };
    let parallelism = parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
    let output = output.unwrap_or_else(|| config.output_dir.clone());

    let exam = parser::parse_exam(&exam_path)?;
    let attempts = parser::load_attempts(&attempts_path)?;

    let exam_id = exam.id.clone();
    let foreign = attempts.iter().filter(|a| a.exam_id != exam_id).count();
    if foreign > 0 {
        tracing::warn!("{foreign} attempt(s) belong to a different exam and will be ignored");
    }

    eprintln!(
        "exameval v{}: grading {} attempt(s) of '{}' ({} mode)",
        env!("CARGO_PKG_VERSION"),
        attempts.len() - foreign,
        exam.title,
        mode
    );
    eprintln!();

    let repository = Arc::new(InMemoryRepository::with_data(vec![exam], attempts));
    let engine = EvaluationEngine::new(
        Arc::clone(&repository) as Arc<dyn ExamRepository>,
        Arc::new(RuleBasedScorer::new(mode)),
        EvaluationEngineConfig {
            parallelism,
            grade_scale: config.grade_scale.clone(),
        },
    );

    let report = engine.run(&exam_id, &ConsoleReporter).await?;

    print_summary(&report);

    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");

    let report_path = output.join(format!("report-{timestamp}.json"));
    report.save_json(&report_path)?;
    eprintln!("Report saved to: {}", report_path.display());

    let graded_path = output.join(format!("graded-{timestamp}.json"));
    parser::save_attempts(&graded_path, &repository.all_attempts().await)?;
    eprintln!("Graded attempts saved to: {}", graded_path.display());

    Ok(())
}

fn print_summary(report: &GradingReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Student", "Score", "%", "Grade", "Auto", "Pending"]);

    for outcome in &report.outcomes {
        table.add_row(vec![
            Cell::new(&outcome.student_id),
            Cell::new(format!("{}/{}", outcome.total_score, outcome.max_score)),
            Cell::new(format!("{}%", outcome.percentage)),
            Cell::new(&outcome.grade),
            Cell::new(outcome.auto_scored),
            Cell::new(outcome.pending),
        ]);
    }

    eprintln!("\n{table}");

    let stats = &report.statistics;
    if stats.graded_attempts > 0 {
        eprintln!(
            "Mean {:.1}/{} ({:.1}%), highest {}, lowest {}",
            stats.mean_score,
            stats.max_score,
            stats.mean_percentage,
            stats.highest_score,
            stats.lowest_score
        );
    }
    if report.skipped > 0 {
        eprintln!("{} attempt(s) not submitted or already graded, skipped", report.skipped);
    }
    if stats.pending_answers > 0 {
        eprintln!("{} answer(s) need manual review", stats.pending_answers);
    }
}
