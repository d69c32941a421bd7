//! Exam file parser.
//!
//! Loads exams from TOML files and directories, loads and saves submission
//! batches as JSON, and validates exams for authoring mistakes.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AnswerValue, Exam, ExamAttempt, ModelAnswer, Question, QuestionType};

/// Intermediate TOML structure for parsing exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
    #[serde(default)]
    model_answers: Vec<TomlModelAnswer>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    duration_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(rename = "type")]
    question_type: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: Option<TomlAnswer>,
    points: i64,
}

#[derive(Debug, Deserialize)]
struct TomlModelAnswer {
    question_id: String,
    answer: TomlAnswer,
    #[serde(default)]
    explanation: Option<String>,
}

/// TOML integers are signed; reject negative indexes here instead of letting
/// them wrap.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TomlAnswer {
    Index(i64),
    Text(String),
}

impl TomlAnswer {
    fn into_answer(self, question_id: &str) -> Result<AnswerValue> {
        match self {
            TomlAnswer::Index(i) => usize::try_from(i)
                .map(AnswerValue::Choice)
                .map_err(|_| anyhow::anyhow!("question '{question_id}': negative option index {i}")),
            TomlAnswer::Text(text) => Ok(AnswerValue::Text(text)),
        }
    }
}

/// Parse a single TOML file into an `Exam`.
pub fn parse_exam(path: &Path) -> Result<Exam> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an `Exam` (useful for testing).
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<Exam> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let question_type: QuestionType = q
                .question_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question '{}': {}", q.id, e))?;
            let points = u32::try_from(q.points)
                .map_err(|_| anyhow::anyhow!("question '{}': points must not be negative", q.id))?;
            let correct_answer = q
                .correct_answer
                .map(|a| a.into_answer(&q.id))
                .transpose()?;

            Ok(Question {
                id: q.id,
                question_type,
                content: q.content,
                options: q.options,
                correct_answer,
                points,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let model_answers = parsed
        .model_answers
        .into_iter()
        .map(|m| {
            let answer = m.answer.into_answer(&m.question_id)?;
            Ok(ModelAnswer {
                question_id: m.question_id,
                answer,
                explanation: m.explanation.filter(|e| !e.trim().is_empty()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Exam {
        id: parsed.exam.id,
        title: parsed.exam.title,
        description: parsed.exam.description,
        duration_minutes: parsed.exam.duration_minutes,
        questions,
        model_answers,
    })
}

/// Recursively load all `.toml` exam files from a directory.
pub fn load_exam_directory(dir: &Path) -> Result<Vec<Exam>> {
    let mut exams = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            exams.extend(load_exam_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_exam(&path) {
                Ok(exam) => exams.push(exam),
                Err(e) => {
                    tracing::warn!("skipping {}: {e:#}", path.display());
                }
            }
        }
    }

    Ok(exams)
}

/// Load a JSON array of exam attempts.
pub fn load_attempts(path: &Path) -> Result<Vec<ExamAttempt>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read attempts file: {}", path.display()))?;
    let attempts: Vec<ExamAttempt> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse attempts JSON: {}", path.display()))?;
    Ok(attempts)
}

/// Write exam attempts as a pretty-printed JSON array.
pub fn save_attempts(path: &Path, attempts: &[ExamAttempt]) -> Result<()> {
    let json = serde_json::to_string_pretty(attempts).context("failed to serialize attempts")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write attempts to {}", path.display()))?;
    Ok(())
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn question(question_id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(question_id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate an exam for common authoring issues.
///
/// Anything reported here that would also stop grading (zero points,
/// missing options, bad model answer index) fails the evaluation run.
pub fn validate_exam(exam: &Exam) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if exam.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "exam has no questions".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for question in &exam.questions {
        if !seen_ids.insert(question.id.as_str()) {
            warnings.push(ValidationWarning::question(
                &question.id,
                format!("duplicate question ID: {}", question.id),
            ));
        }
    }

    let mut model_answers: HashMap<&str, &ModelAnswer> = HashMap::new();
    for model_answer in &exam.model_answers {
        let id = model_answer.question_id.as_str();
        if exam.question(id).is_none() {
            warnings.push(ValidationWarning::question(
                id,
                "model answer refers to an unknown question",
            ));
        }
        if model_answers.insert(id, model_answer).is_some() {
            warnings.push(ValidationWarning::question(
                id,
                "duplicate model answer; only the first is used for grading",
            ));
        }
    }

    for question in &exam.questions {
        let id = question.id.as_str();

        if question.points == 0 {
            warnings.push(ValidationWarning::question(
                id,
                "points must be a positive integer",
            ));
        }
        if question.content.trim().is_empty() {
            warnings.push(ValidationWarning::question(id, "prompt is empty"));
        }

        let model_answer = exam.model_answer(id);
        match question.question_type {
            QuestionType::MultipleChoice => {
                if question.options.is_empty() {
                    warnings.push(ValidationWarning::question(
                        id,
                        "multiple-choice question has no options",
                    ));
                }
                if let Some(answer) = &question.correct_answer {
                    if let Some(problem) = choice_problem(answer, question.options.len()) {
                        warnings.push(ValidationWarning::question(
                            id,
                            format!("correct_answer {problem}"),
                        ));
                    }
                }
                if let Some(m) = model_answer {
                    if let Some(problem) = choice_problem(&m.answer, question.options.len()) {
                        warnings.push(ValidationWarning::question(
                            id,
                            format!("model answer {problem}"),
                        ));
                    }
                }
            }
            QuestionType::ShortAnswer | QuestionType::LongAnswer | QuestionType::PdfUpload => {
                if !question.options.is_empty() {
                    warnings.push(ValidationWarning::question(
                        id,
                        format!("{} question has options; they are ignored", question.question_type),
                    ));
                }
            }
        }

        if question.question_type.is_auto_gradable() && model_answer.is_none() {
            warnings.push(ValidationWarning::question(
                id,
                "no model answer; answers will be left for manual review",
            ));
        }

        if let (Some(expected), Some(m)) = (&question.correct_answer, model_answer) {
            if !answers_agree(expected, &m.answer) {
                warnings.push(ValidationWarning::question(
                    id,
                    format!(
                        "model answer '{}' disagrees with correct_answer '{}'; the model answer is used",
                        m.answer, expected
                    ),
                ));
            }
        }
    }

    warnings
}

fn choice_problem(answer: &AnswerValue, option_count: usize) -> Option<String> {
    match answer {
        AnswerValue::Text(text) => Some(format!("must be an option index, got text '{text}'")),
        AnswerValue::Choice(index) if *index >= option_count => Some(format!(
            "index {index} is out of range for {option_count} options"
        )),
        AnswerValue::Choice(_) => None,
    }
}

fn answers_agree(a: &AnswerValue, b: &AnswerValue) -> bool {
    match (a, b) {
        (AnswerValue::Choice(x), AnswerValue::Choice(y)) => x == y,
        (AnswerValue::Text(x), AnswerValue::Text(y)) => {
            x.trim().to_lowercase() == y.trim().to_lowercase()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[exam]
id = "intro-cs"
title = "Intro to Computer Science"
description = "Week 3 quiz"
duration_minutes = 30

[[questions]]
id = "q1"
type = "multiple-choice"
content = "Which structure is LIFO?"
options = ["Queue", "Stack", "Heap"]
correct_answer = 1
points = 5

[[questions]]
id = "q2"
type = "short-answer"
content = "Name the CPU component that performs arithmetic."
correct_answer = "arithmetic logic unit"
points = 10

[[questions]]
id = "q3"
type = "pdf-upload"
content = "Upload your flowchart."
points = 10

[[model_answers]]
question_id = "q1"
answer = 1
explanation = "A stack pops the most recently pushed item."

[[model_answers]]
question_id = "q2"
answer = "arithmetic logic unit"
"#;

    fn parse(toml: &str) -> Exam {
        parse_exam_str(toml, &PathBuf::from("test.toml")).unwrap()
    }

    #[test]
    fn parse_valid_toml() {
        let exam = parse(VALID_TOML);
        assert_eq!(exam.id, "intro-cs");
        assert_eq!(exam.duration_minutes, Some(30));
        assert_eq!(exam.questions.len(), 3);
        assert_eq!(exam.questions[0].question_type, QuestionType::MultipleChoice);
        assert_eq!(exam.questions[0].correct_answer, Some(AnswerValue::Choice(1)));
        assert_eq!(exam.questions[2].question_type, QuestionType::PdfUpload);
        assert_eq!(exam.model_answers.len(), 2);
        assert_eq!(exam.model_answers[0].answer, AnswerValue::Choice(1));
        assert!(exam.model_answers[1].explanation.is_none());
        assert_eq!(exam.total_points(), 25);
        assert!(exam.ensure_gradable().is_ok());
    }

    #[test]
    fn parse_question_type_aliases() {
        let toml = r#"
[exam]
id = "aliases"
title = "Aliases"

[[questions]]
id = "essay"
type = "essay"
content = "Discuss."
points = 20
"#;
        let exam = parse(toml);
        assert_eq!(exam.questions[0].question_type, QuestionType::LongAnswer);
        assert!(exam.description.is_empty());
    }

    #[test]
    fn parse_rejects_unknown_type_and_negative_values() {
        let unknown = r#"
[exam]
id = "x"
title = "X"

[[questions]]
id = "q1"
type = "matching"
points = 1
"#;
        let err = parse_exam_str(unknown, &PathBuf::from("x.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("unknown question type"));

        let negative = r#"
[exam]
id = "x"
title = "X"

[[questions]]
id = "q1"
type = "multiple-choice"
options = ["a", "b"]
points = 1

[[model_answers]]
question_id = "q1"
answer = -1
"#;
        let err = parse_exam_str(negative, &PathBuf::from("x.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("negative option index"));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_exam_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn validate_clean_exam_has_no_warnings() {
        let warnings = validate_exam(&parse(VALID_TOML));
        assert!(warnings.is_empty(), "unexpected: {warnings:?}");
    }

    #[test]
    fn validate_reports_authoring_mistakes() {
        let toml = r#"
[exam]
id = "broken"
title = "Broken"

[[questions]]
id = "q1"
type = "multiple-choice"
content = "Pick"
options = ["a", "b"]
correct_answer = 0
points = 0

[[questions]]
id = "q1"
type = "short-answer"
content = ""
options = ["ignored"]
points = 5

[[questions]]
id = "q3"
type = "long-answer"
content = "Explain"
points = 5

[[model_answers]]
question_id = "q1"
answer = "b"

[[model_answers]]
question_id = "q1"
answer = 1

[[model_answers]]
question_id = "ghost"
answer = "boo"
"#;
        let warnings = validate_exam(&parse(toml));
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));

        assert!(has("duplicate question ID"));
        assert!(has("points must be a positive integer"));
        assert!(has("model answer must be an option index"));
        assert!(has("disagrees with correct_answer"));
        assert!(has("duplicate model answer"));
        assert!(has("unknown question"));
        assert!(has("prompt is empty"));
        assert!(has("has options"));
        assert!(warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("q3") && w.message.contains("manual review")));
    }

    #[test]
    fn validate_out_of_range_index() {
        let toml = r#"
[exam]
id = "range"
title = "Range"

[[questions]]
id = "q1"
type = "multiple-choice"
content = "Pick"
options = ["a", "b"]
correct_answer = 2
points = 1

[[model_answers]]
question_id = "q1"
answer = 2
"#;
        let warnings = validate_exam(&parse(toml));
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.message.contains("out of range"))
                .count(),
            2
        );
    }

    #[test]
    fn non_ascii_case_difference_is_not_a_disagreement() {
        let toml = r#"
[exam]
id = "german"
title = "German"

[[questions]]
id = "q1"
type = "short-answer"
content = "Translate 'annoyance'."
correct_answer = "Ärger"
points = 2

[[model_answers]]
question_id = "q1"
answer = " ärger"
"#;
        let warnings = validate_exam(&parse(toml));
        assert!(warnings.is_empty(), "unexpected: {warnings:?}");
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quiz.toml"), VALID_TOML).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("bad.toml"), "not [toml").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let exams = load_exam_directory(dir.path()).unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].id, "intro-cs");
    }

    #[test]
    fn attempts_json_roundtrip() {
        let exam = parse(VALID_TOML);
        let mut attempt = ExamAttempt::start(&exam, "ada");
        attempt.record_answer("q1", 1usize).unwrap();
        attempt.record_answer("q2", "ALU").unwrap();
        attempt.submit().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("attempts.json");
        save_attempts(&path, &[attempt.clone()]).unwrap();

        let loaded = load_attempts(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, attempt.id);
        assert_eq!(loaded[0].answers[0].answer, AnswerValue::Choice(1));
        assert_eq!(loaded[0].answers[1].answer, AnswerValue::Text("ALU".into()));
    }

    #[test]
    fn load_attempts_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_attempts(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse attempts JSON"));
    }
}
