//! In-memory exam repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{Exam, ExamAttempt};
use crate::traits::ExamRepository;

/// Keeps exams and attempts in process memory.
///
/// Attempts are returned in insertion order; saving an attempt with a known
/// id replaces it in place.
#[derive(Default)]
pub struct InMemoryRepository {
    exams: RwLock<HashMap<String, Exam>>,
    attempts: RwLock<Vec<ExamAttempt>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-loaded with exams and attempts.
    pub fn with_data(exams: Vec<Exam>, attempts: Vec<ExamAttempt>) -> Self {
        Self {
            exams: RwLock::new(exams.into_iter().map(|e| (e.id.clone(), e)).collect()),
            attempts: RwLock::new(attempts),
        }
    }

    pub async fn insert_exam(&self, exam: Exam) {
        self.exams.write().await.insert(exam.id.clone(), exam);
    }

    /// Snapshot of every stored attempt.
    pub async fn all_attempts(&self) -> Vec<ExamAttempt> {
        self.attempts.read().await.clone()
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn get_exam(&self, exam_id: &str) -> anyhow::Result<Option<Exam>> {
        Ok(self.exams.read().await.get(exam_id).cloned())
    }

    async fn list_attempts(&self, exam_id: &str) -> anyhow::Result<Vec<ExamAttempt>> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .filter(|a| a.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn save_attempt(&self, attempt: &ExamAttempt) -> anyhow::Result<()> {
        let mut attempts = self.attempts.write().await;
        match attempts.iter_mut().find(|a| a.id == attempt.id) {
            Some(existing) => *existing = attempt.clone(),
            None => attempts.push(attempt.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttemptStatus;

    fn exam(id: &str) -> Exam {
        Exam {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            duration_minutes: None,
            questions: vec![],
            model_answers: vec![],
        }
    }

    #[tokio::test]
    async fn list_attempts_filters_by_exam() {
        let a = exam("a");
        let b = exam("b");
        let repo = InMemoryRepository::with_data(
            vec![a.clone(), b.clone()],
            vec![
                ExamAttempt::start(&a, "s1"),
                ExamAttempt::start(&b, "s2"),
                ExamAttempt::start(&a, "s3"),
            ],
        );

        let attempts = repo.list_attempts("a").await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].student_id, "s1");
        assert_eq!(attempts[1].student_id, "s3");
        assert!(repo.get_exam("b").await.unwrap().is_some());
        assert!(repo.get_exam("c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_attempt_replaces_by_id() {
        let a = exam("a");
        let repo = InMemoryRepository::new();
        repo.insert_exam(a.clone()).await;

        let mut attempt = ExamAttempt::start(&a, "s1");
        repo.save_attempt(&attempt).await.unwrap();
        attempt.submit().unwrap();
        repo.save_attempt(&attempt).await.unwrap();

        let stored = repo.all_attempts().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, AttemptStatus::Completed);
    }
}
