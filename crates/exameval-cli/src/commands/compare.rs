//! The `exameval compare` command.

use std::path::PathBuf;

use anyhow::Result;

use exameval_core::report::GradingReport;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: u32,
    fail_on_lowered: bool,
    format: String,
) -> Result<()> {
    let baseline = GradingReport::load_json(&baseline_path)?;
    let current = GradingReport::load_json(&current_path)?;

    if baseline.exam.id != current.exam.id {
        tracing::warn!(
            "comparing reports of different exams: '{}' vs '{}'",
            baseline.exam.id,
            current.exam.id
        );
    }

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Comparison: {} lowered, {} raised, {} unchanged",
                report.lowered.len(),
                report.raised.len(),
                report.unchanged
            );

            for (title, changes) in [("Lowered", &report.lowered), ("Raised", &report.raised)] {
                if changes.is_empty() {
                    continue;
                }
                println!("\n{title}:");
                for c in changes {
                    println!(
                        "  {} ({}) {} {} -> {} {} ({:+})",
                        c.student_id,
                        c.attempt_id,
                        c.baseline_score,
                        c.baseline_grade,
                        c.current_score,
                        c.current_grade,
                        c.delta
                    );
                }
            }

            if report.new_attempts > 0 {
                println!("\n{} new attempt(s)", report.new_attempts);
            }
            if report.removed_attempts > 0 {
                println!("{} removed attempt(s)", report.removed_attempts);
            }
        }
    }

    if fail_on_lowered && report.has_lowered() {
        std::process::exit(1);
    }

    Ok(())
}
