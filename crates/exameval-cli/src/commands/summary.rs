//! The `exameval summary` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use exameval_core::report::GradingReport;

pub fn execute(report_path: PathBuf, format: String) -> Result<()> {
    let report = GradingReport::load_json(&report_path)?;

    match format.as_str() {
        "markdown" | "md" => print!("{}", to_markdown(&report)),
        _ => print_text(&report),
    }

    Ok(())
}

fn print_text(report: &GradingReport) {
    println!(
        "Exam: {} ({} questions, {} points)",
        report.exam.title, report.exam.question_count, report.exam.total_points
    );
    println!(
        "Graded {} attempt(s) with {} at {}",
        report.outcomes.len(),
        report.scorer,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let mut table = Table::new();
    table.set_header(vec!["Student", "Score", "%", "Grade", "Pending"]);
    for outcome in &report.outcomes {
        table.add_row(vec![
            Cell::new(&outcome.student_id),
            Cell::new(format!("{}/{}", outcome.total_score, outcome.max_score)),
            Cell::new(format!("{}%", outcome.percentage)),
            Cell::new(&outcome.grade),
            Cell::new(outcome.pending),
        ]);
    }
    println!("{table}");

    let stats = &report.statistics;
    println!(
        "Mean: {:.1} ({:.1}%)  Highest: {}  Lowest: {}",
        stats.mean_score, stats.mean_percentage, stats.highest_score, stats.lowest_score
    );
    let distribution: Vec<String> = stats
        .grade_distribution
        .iter()
        .map(|(grade, count)| format!("{grade}: {count}"))
        .collect();
    if !distribution.is_empty() {
        println!("Grades: {}", distribution.join(", "));
    }
    println!(
        "Answers: {} auto-scored, {} pending manual review",
        report.auto_scored(),
        report.pending()
    );

    for failure in &report.failures {
        println!(
            "FAILED: {} ({}): {}",
            failure.student_id, failure.attempt_id, failure.error
        );
    }
}

fn to_markdown(report: &GradingReport) -> String {
    let mut md = String::new();

    md.push_str(&format!("## {}\n\n", report.exam.title));
    md.push_str(&format!(
        "**Scorer:** {}  \n**Attempts:** {}  \n**Mean:** {:.1}/{} ({:.1}%)\n\n",
        report.scorer,
        report.outcomes.len(),
        report.statistics.mean_score,
        report.statistics.max_score,
        report.statistics.mean_percentage
    ));

    md.push_str("| Student | Score | % | Grade | Pending |\n");
    md.push_str("|---------|-------|---|-------|---------|\n");
    for o in &report.outcomes {
        md.push_str(&format!(
            "| {} | {}/{} | {} | {} | {} |\n",
            o.student_id, o.total_score, o.max_score, o.percentage, o.grade, o.pending
        ));
    }

    if !report.statistics.per_question.is_empty() {
        md.push_str("\n| Question | Points | Mean | Full marks | Pending |\n");
        md.push_str("|----------|--------|------|------------|---------|\n");
        for q in &report.statistics.per_question {
            md.push_str(&format!(
                "| {} | {} | {:.1} | {} | {} |\n",
                q.question_id, q.points, q.mean_score, q.full_marks, q.pending
            ));
        }
    }

    md
}
