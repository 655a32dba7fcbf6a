use async_trait::async_trait;
use exam_core::model::{ExamSetId, Part, Question, QuestionId, SessionId, Submission};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Failures shared by the question bank and the result log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted exam result with its storage identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub submission: Submission,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: i64, submission: Submission) -> Self {
        Self { id, submission }
    }
}

/// Question bank access used to resolve exam questions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question, optionally attached to an exam set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(
        &self,
        exam_set_id: Option<ExamSetId>,
        question: &Question,
    ) -> Result<(), StorageError>;

    /// List candidate questions in the given parts, ordered by part then id.
    ///
    /// With an exam set, only that set's questions are returned; without one,
    /// the whole bank is eligible.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_candidates(
        &self,
        exam_set_id: Option<ExamSetId>,
        parts: &BTreeSet<Part>,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Result sink for finished sessions.
#[async_trait]
pub trait ExamResultRepository: Send + Sync {
    /// Append a finished session. A session can be stored only once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session was already stored,
    /// or other storage errors.
    async fn append_result(&self, submission: &Submission) -> Result<i64, StorageError>;

    /// Fetch a stored result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_result(&self, id: i64) -> Result<Submission, StorageError>;

    /// Look up the storage id of a session's result, if it was stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn find_result_id(&self, session_id: SessionId) -> Result<Option<i64>, StorageError>;

    /// Most recent results first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError>;
}

/// Process-local bank and result log, used by tests and `ExamServices::in_memory`.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, (Option<ExamSetId>, Question)>>>,
    results: Arc<Mutex<Vec<Submission>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(
        &self,
        exam_set_id: Option<ExamSetId>,
        question: &Question,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(question.id(), (exam_set_id, question.clone()));
        Ok(())
    }

    async fn list_candidates(
        &self,
        exam_set_id: Option<ExamSetId>,
        parts: &BTreeSet<Part>,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<Question> = guard
            .values()
            .filter(|(set, q)| {
                parts.contains(&q.part()) && (exam_set_id.is_none() || *set == exam_set_id)
            })
            .map(|(_, q)| q.clone())
            .collect();
        found.sort_by_key(|q| (q.part(), q.id()));
        Ok(found)
    }
}

#[async_trait]
impl ExamResultRepository for InMemoryRepository {
    async fn append_result(&self, submission: &Submission) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .iter()
            .any(|s| s.session_id() == submission.session_id())
        {
            return Err(StorageError::Conflict);
        }
        guard.push(submission.clone());
        i64::try_from(guard.len()).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn get_result(&self, id: i64) -> Result<Submission, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        usize::try_from(id)
            .ok()
            .and_then(|idx| idx.checked_sub(1))
            .and_then(|idx| guard.get(idx))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn find_result_id(&self, session_id: SessionId) -> Result<Option<i64>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .position(|s| s.session_id() == session_id)
            .and_then(|idx| i64::try_from(idx + 1).ok()))
    }

    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows = Vec::with_capacity(guard.len());
        for (idx, submission) in guard.iter().enumerate() {
            let id = i64::try_from(idx + 1).map_err(|e| StorageError::Serialization(e.to_string()))?;
            rows.push(ResultRow::new(id, submission.clone()));
        }
        rows.sort_by(|a, b| {
            b.submission
                .submitted_at()
                .cmp(&a.submission.submitted_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn ExamResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ExamResultRepository> = Arc::new(repo);
        Self { questions, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{
        Answer, ExamConfiguration, PassageId, ScoreResult, TerminationReason,
    };
    use exam_core::time::fixed_now;

    fn build_question(id: u64, part: u8) -> Question {
        Question::new(
            QuestionId::new(id),
            Part::new(part).unwrap(),
            format!("Q{id}"),
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            "A",
            (part == 7).then(|| PassageId::new("doc-1")),
        )
        .unwrap()
    }

    fn build_submission(offset_minutes: i64) -> Submission {
        let config = ExamConfiguration::standard([5], 1, 1).unwrap();
        let started = fixed_now() + chrono::Duration::minutes(offset_minutes);
        Submission::new(
            SessionId::generate(),
            config,
            ScoreResult {
                total_questions: 1,
                correct_count: 1,
                answered_count: 1,
                score_percent: 100,
                time_spent_seconds: 30,
                per_part: BTreeMap::new(),
            },
            vec![Answer {
                question_id: QuestionId::new(1),
                selected_choice: Some("A".into()),
                elapsed_ms: 30_000,
            }],
            started,
            started + chrono::Duration::seconds(30),
            TerminationReason::UserSubmitted,
        )
        .unwrap()
    }

    fn parts(items: &[u8]) -> BTreeSet<Part> {
        items.iter().map(|p| Part::new(*p).unwrap()).collect()
    }

    #[tokio::test]
    async fn candidates_filter_by_part_and_set() {
        let repo = InMemoryRepository::new();
        let set = ExamSetId::new(3);
        repo.upsert_question(Some(set), &build_question(1, 5)).await.unwrap();
        repo.upsert_question(None, &build_question(2, 5)).await.unwrap();
        repo.upsert_question(Some(set), &build_question(3, 7)).await.unwrap();
        repo.upsert_question(Some(set), &build_question(4, 1)).await.unwrap();

        let in_set = repo.list_candidates(Some(set), &parts(&[5, 7])).await.unwrap();
        let ids: Vec<u64> = in_set.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 3]);

        let whole_bank = repo.list_candidates(None, &parts(&[5])).await.unwrap();
        assert_eq!(whole_bank.len(), 2);
    }

    #[tokio::test]
    async fn results_are_unique_per_session() {
        let repo = InMemoryRepository::new();
        let submission = build_submission(0);

        let id = repo.append_result(&submission).await.unwrap();
        let err = repo.append_result(&submission).await.unwrap_err();

        assert!(matches!(err, StorageError::Conflict));
        assert_eq!(
            repo.find_result_id(submission.session_id()).await.unwrap(),
            Some(id)
        );
        assert_eq!(repo.get_result(id).await.unwrap(), submission);
    }

    #[tokio::test]
    async fn recent_results_newest_first() {
        let repo = InMemoryRepository::new();
        let older = build_submission(0);
        let newer = build_submission(60);
        repo.append_result(&older).await.unwrap();
        repo.append_result(&newer).await.unwrap();

        let rows = repo.list_recent_results(1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].submission.session_id(), newer.session_id());
    }

    #[tokio::test]
    async fn missing_result_is_not_found() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.get_result(0).await.unwrap_err(),
            StorageError::NotFound
        ));
        assert!(matches!(
            repo.get_result(5).await.unwrap_err(),
            StorageError::NotFound
        ));
    }
}
