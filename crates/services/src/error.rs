//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{ExamConfigError, Part, QuestionId, SessionStatus, SubmissionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Why a session could not be built from the question supply.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadFailure {
    #[error("question supply failed: {0}")]
    Supply(#[source] StorageError),
    #[error("question supply returned no usable questions")]
    NoQuestions,
    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

/// Errors emitted by exam session operations.
///
/// Every rejected operation leaves the session unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {action} while the session is {from}")]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },
    #[error("question index {index} is outside 0..{len}")]
    OutOfRange { index: i64, len: usize },
    #[error("backward navigation is locked in listening {part}")]
    NavigationLocked { part: Part },
    #[error("session already submitted")]
    AlreadySubmitted,
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),
    #[error("{choice:?} is not a choice of question {question_id}")]
    InvalidChoice {
        question_id: QuestionId,
        choice: String,
    },
    #[error("could not load questions: {0}")]
    LoadFailed(#[source] LoadFailure),
    #[error("could not persist the exam result: {0}")]
    PersistenceFailed(#[source] StorageError),
    #[error(transparent)]
    Config(#[from] ExamConfigError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl SessionError {
    /// Stable reason code for presentation layers.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidTransition { .. } => "invalid_transition",
            SessionError::OutOfRange { .. } => "out_of_range",
            SessionError::NavigationLocked { .. } => "navigation_locked",
            SessionError::AlreadySubmitted => "already_submitted",
            SessionError::UnknownQuestion(_) => "unknown_question",
            SessionError::InvalidChoice { .. } => "invalid_choice",
            SessionError::LoadFailed(_) => "load_failed",
            SessionError::PersistenceFailed(_) => "persistence_failed",
            SessionError::Config(_) => "invalid_config",
            SessionError::Submission(_) => "invalid_submission",
        }
    }

    /// Load and persistence failures can be retried; everything else is a
    /// rejected action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::LoadFailed(_) | SessionError::PersistenceFailed(_)
        )
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServicesInitError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
