use chrono::{DateTime, Utc};
use std::sync::Arc;

use exam_core::model::{ExamSetId, SessionId, Submission, TerminationReason};
use storage::repository::{ExamResultRepository, InMemoryRepository};

use crate::error::SessionError;

/// Storage identifier for a persisted exam result.
///
/// NOTE: This is `i64` to match `SQLite` row ids.
pub type ResultId = i64;

/// Presentation-agnostic list item for a finished exam.
///
/// No pre-formatted strings; the shell formats times and percentages itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultListItem {
    pub id: ResultId,
    pub session_id: SessionId,
    pub exam_set_id: Option<ExamSetId>,
    pub submitted_at: DateTime<Utc>,
    pub termination: TerminationReason,

    pub score_percent: u32,
    pub correct: u32,
    pub total: u32,
    pub time_spent_seconds: u64,
}

impl ResultListItem {
    #[must_use]
    pub fn from_submission(id: ResultId, submission: &Submission) -> Self {
        let score = submission.score();
        Self {
            id,
            session_id: submission.session_id(),
            exam_set_id: submission.exam_set_id(),
            submitted_at: submission.submitted_at(),
            termination: submission.termination(),
            score_percent: score.score_percent,
            correct: score.correct_count,
            total: score.total_questions,
            time_spent_seconds: score.time_spent_seconds,
        }
    }
}

/// Read side for stored results. Hides repositories from the shell.
#[derive(Clone)]
pub struct ResultSummaryService {
    results: Arc<dyn ExamResultRepository>,
}

impl ResultSummaryService {
    #[must_use]
    pub fn new(results: Arc<dyn ExamResultRepository>) -> Self {
        Self { results }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    /// Load one stored result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` on repository failures,
    /// including `StorageError::NotFound`.
    pub async fn get_result(&self, id: ResultId) -> Result<Submission, SessionError> {
        self.results
            .get_result(id)
            .await
            .map_err(SessionError::PersistenceFailed)
    }

    /// Newest results first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` on repository failures.
    pub async fn list_recent_results(
        &self,
        limit: u32,
    ) -> Result<Vec<ResultListItem>, SessionError> {
        let rows = self
            .results
            .list_recent_results(limit)
            .await
            .map_err(SessionError::PersistenceFailed)?;
        Ok(rows
            .iter()
            .map(|row| ResultListItem::from_submission(row.id, &row.submission))
            .collect())
    }
}
