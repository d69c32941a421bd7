//! End-to-end pipeline tests: exam TOML → validation → batch grading → report.
//!
//! These tests drive the library the same way the `grade` command does, with
//! the exam and submissions built in memory instead of read from disk.

use std::path::Path;
use std::sync::Arc;

use exameval_core::engine::{EvaluationEngine, EvaluationEngineConfig, NoopReporter};
use exameval_core::model::{AttemptStatus, Exam, ExamAttempt};
use exameval_core::parser::{parse_exam_str, validate_exam};
use exameval_core::report::GradingReport;
use exameval_core::repository::InMemoryRepository;
use exameval_core::scoring::{MatchingMode, RuleBasedScorer};

const EXAM_TOML: &str = r#"
[exam]
id = "data-structures"
title = "Data Structures"
duration_minutes = 45

[[questions]]
id = "q1"
type = "multiple-choice"
content = "Which traversal visits a binary search tree in sorted order?"
options = ["Pre-order", "Post-order", "In-order", "Level-order"]
correct_answer = 2
points = 10

[[questions]]
id = "q2"
type = "short-answer"
content = "Which structure keeps keys ordered and supports O(log n) lookup?"
correct_answer = "binary search tree"
points = 20

[[questions]]
id = "q3"
type = "long-answer"
content = "Compare arrays and linked lists."
points = 25

[[questions]]
id = "q4"
type = "short-answer"
content = "Which structure backs recursive calls?"
points = 10

[[questions]]
id = "q5"
type = "short-answer"
content = "Name a self-balancing tree."
points = 5

[[model_answers]]
question_id = "q1"
answer = 2
explanation = "In-order traversal visits left, node, right."

[[model_answers]]
question_id = "q2"
answer = "binary search tree"

[[model_answers]]
question_id = "q3"
answer = "Arrays give constant-time indexing; linked lists give constant-time insertion."

[[model_answers]]
question_id = "q4"
answer = "stack"
"#;

fn exam() -> Exam {
    parse_exam_str(EXAM_TOML, Path::new("data-structures.toml")).unwrap()
}

fn essay() -> String {
    "Arrays store elements contiguously so indexing is constant time, ".repeat(4)
}

fn submission(exam: &Exam, student: &str, q1: usize, q2: &str, q3: &str, q4: &str) -> ExamAttempt {
    let mut attempt = ExamAttempt::start(exam, student);
    attempt.record_answer("q1", q1).unwrap();
    attempt.record_answer("q2", q2).unwrap();
    attempt.record_answer("q3", q3).unwrap();
    attempt.record_answer("q4", q4).unwrap();
    attempt.record_answer("q5", "AVL tree").unwrap();
    attempt.submit().unwrap();
    attempt
}

async fn grade(
    exam: &Exam,
    attempts: Vec<ExamAttempt>,
    mode: MatchingMode,
) -> (GradingReport, Vec<ExamAttempt>) {
    let repository = Arc::new(InMemoryRepository::with_data(vec![exam.clone()], attempts));
    let engine = EvaluationEngine::new(
        repository.clone(),
        Arc::new(RuleBasedScorer::new(mode)),
        EvaluationEngineConfig::default(),
    );
    let report = engine.run(&exam.id, &NoopReporter).await.unwrap();
    (report, repository.all_attempts().await)
}

#[test]
fn authoring_validation_flags_missing_model_answer() {
    let warnings = validate_exam(&exam());
    assert_eq!(warnings.len(), 1, "unexpected: {warnings:?}");
    assert_eq!(warnings[0].question_id.as_deref(), Some("q5"));
    assert!(warnings[0].message.contains("manual review"));
}

#[tokio::test]
async fn flexible_batch_scores_four_and_leaves_one_pending() {
    let exam = exam();
    let attempt = submission(
        &exam,
        "ada",
        2,
        "it is a tree used for binary searching",
        &essay(),
        "Stack",
    );

    let (report, stored) = grade(&exam, vec![attempt], MatchingMode::Flexible).await;

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.auto_scored, 4);
    assert_eq!(outcome.pending, 1);
    // 10 + 20 + round(25 * 0.7) + 10
    assert_eq!(outcome.total_score, 58);
    assert_eq!(outcome.max_score, 70);

    let graded = &stored[0];
    assert_eq!(graded.status, AttemptStatus::Graded);
    assert_eq!(graded.total_score, Some(58));
    let scores: Vec<Option<u32>> = graded.answers.iter().map(|a| a.score).collect();
    assert_eq!(scores, vec![Some(10), Some(20), Some(18), Some(10), None]);
    assert_eq!(
        graded.answers[0].feedback.as_deref(),
        Some("Correct answer In-order traversal visits left, node, right.")
    );
    assert!(graded.answers[4].feedback.is_none());
}

#[tokio::test]
async fn strict_batch_defers_long_answers() {
    let exam = exam();
    let attempts = vec![
        submission(&exam, "ada", 2, "Binary Search Tree ", &essay(), "stack"),
        submission(&exam, "bob", 0, "hash map", "", "queue"),
    ];

    let (report, stored) = grade(&exam, attempts, MatchingMode::Strict).await;

    assert_eq!(report.scorer, "rule-based/strict");
    assert_eq!(report.outcomes[0].total_score, 40);
    assert_eq!(report.outcomes[1].total_score, 0);

    let bob = &stored[1];
    assert_eq!(
        bob.answers[0].feedback.as_deref(),
        Some("Incorrect. The correct answer is option C. In-order traversal visits left, node, right.")
    );
    assert_eq!(
        bob.answers[1].feedback.as_deref(),
        Some("Incorrect. Expected: binary search tree")
    );
    assert_eq!(
        bob.answers[2].feedback.as_deref(),
        Some("This answer requires manual evaluation.")
    );

    let q3 = &report.statistics.per_question[2];
    assert_eq!(q3.scored, 2);
    assert_eq!(q3.mean_score, 0.0);
    let q5 = &report.statistics.per_question[4];
    assert_eq!(q5.pending, 2);
}

#[tokio::test]
async fn report_survives_json_roundtrip() {
    let exam = exam();
    let attempt = submission(&exam, "ada", 2, "binary search tree", &essay(), "stack");
    let (report, _) = grade(&exam, vec![attempt], MatchingMode::Strict).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    report.save_json(&path).unwrap();
    let loaded = GradingReport::load_json(&path).unwrap();

    assert_eq!(loaded.id, report.id);
    assert_eq!(loaded.exam.title, "Data Structures");
    assert_eq!(loaded.outcomes[0].total_score, 40);
    assert_eq!(loaded.auto_scored(), 4);
    assert_eq!(loaded.pending(), 1);
    assert_eq!(loaded.statistics.grade_distribution.get("F"), Some(&1));
}

#[tokio::test]
async fn regrading_the_same_repository_is_a_no_op() {
    let exam = exam();
    let attempt = submission(&exam, "ada", 2, "binary search tree", &essay(), "stack");
    let repository = Arc::new(InMemoryRepository::with_data(vec![exam.clone()], vec![attempt]));
    let engine = EvaluationEngine::new(
        repository.clone(),
        Arc::new(RuleBasedScorer::new(MatchingMode::Flexible)),
        EvaluationEngineConfig::default(),
    );

    let first = engine.run(&exam.id, &NoopReporter).await.unwrap();
    let second = engine.run(&exam.id, &NoopReporter).await.unwrap();

    assert_eq!(first.outcomes.len(), 1);
    assert!(second.outcomes.is_empty());
    assert_eq!(second.skipped, 1);
}
