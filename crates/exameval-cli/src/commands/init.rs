//! The `exameval init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("exameval.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("exams")?;
    write_if_missing(Path::new("exams/example.toml"), EXAMPLE_EXAM)?;

    std::fs::create_dir_all("submissions")?;
    write_if_missing(Path::new("submissions/example.json"), EXAMPLE_SUBMISSIONS)?;

    println!("\nNext steps:");
    println!("  1. Run: exameval validate --exam exams/example.toml");
    println!(
        "  2. Run: exameval grade --exam exams/example.toml --attempts submissions/example.json"
    );
    println!("  3. Try --mode flexible for partial credit on text answers");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# exameval configuration

# strict: exact matches only; flexible: key-term and length partial credit.
# EXAMEVAL_MODE overrides this value.
default_mode = "strict"
parallelism = 4
output_dir = "./exameval-results"

[grade_scale]
a = 90
b = 80
c = 70
d = 60
"#;

const EXAMPLE_EXAM: &str = r#"[exam]
id = "example"
title = "Computer Basics"
description = "A short example exam to get started"
duration_minutes = 20

[[questions]]
id = "q1"
type = "multiple-choice"
content = "Which data structure returns the most recently added item first?"
options = ["Queue", "Stack", "Heap", "Tree"]
correct_answer = 1
points = 5

[[questions]]
id = "q2"
type = "short-answer"
content = "What does CPU stand for?"
correct_answer = "central processing unit"
points = 10

[[questions]]
id = "q3"
type = "long-answer"
content = "Explain the difference between RAM and disk storage."
points = 20

[[questions]]
id = "q4"
type = "pdf-upload"
content = "Upload a diagram of the fetch-decode-execute cycle."
points = 10

[[model_answers]]
question_id = "q1"
answer = 1
explanation = "A stack is last-in, first-out."

[[model_answers]]
question_id = "q2"
answer = "central processing unit"

[[model_answers]]
question_id = "q3"
answer = "RAM is fast volatile memory used while programs run; disk storage is slower but keeps data without power."
"#;

const EXAMPLE_SUBMISSIONS: &str = r#"[
  {
    "id": "attempt-1",
    "examId": "example",
    "studentId": "alice",
    "startTime": "2025-01-06T09:00:00Z",
    "endTime": "2025-01-06T09:18:00Z",
    "status": "completed",
    "answers": [
      { "questionId": "q1", "answer": 1 },
      { "questionId": "q2", "answer": "Central Processing Unit" },
      { "questionId": "q3", "answer": "RAM is volatile working memory that the CPU reads quickly, while a disk keeps files permanently even when the computer is switched off, at the cost of much slower access." },
      { "questionId": "q4", "answer": "fetch-cycle.pdf" }
    ]
  },
  {
    "id": "attempt-2",
    "examId": "example",
    "studentId": "bob",
    "startTime": "2025-01-06T09:01:00Z",
    "endTime": "2025-01-06T09:20:00Z",
    "status": "completed",
    "answers": [
      { "questionId": "q1", "answer": 0 },
      { "questionId": "q2", "answer": "processing unit" },
      { "questionId": "q3", "answer": "RAM is faster." },
      { "questionId": "q4", "answer": "", "markedForReview": true }
    ]
  },
  {
    "id": "attempt-3",
    "examId": "example",
    "studentId": "carol",
    "startTime": "2025-01-06T09:02:00Z",
    "status": "in-progress",
    "answers": [
      { "questionId": "q1", "answer": 1 }
    ]
  }
]
"#;
