use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use exam_core::model::{ExamConfiguration, ScoreResult};
use exam_core::{Clock, TickSource};
use storage::repository::{ExamResultRepository, StorageError};

use super::machine::ExamSession;
use super::queries::SessionQueries;
use super::supply::QuestionSupply;
use super::view::ResultId;
use crate::error::SessionError;

/// Result of submitting and persisting a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedResult {
    pub result_id: ResultId,
    pub score: ScoreResult,
}

/// How often, and how far apart, a failed result write is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Orchestrates session loading and result persistence.
#[derive(Clone)]
pub struct ExamSessionService {
    clock: Clock,
    supply: Arc<dyn QuestionSupply>,
    results: Arc<dyn ExamResultRepository>,
}

impl ExamSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        supply: Arc<dyn QuestionSupply>,
        results: Arc<dyn ExamResultRepository>,
    ) -> Self {
        Self {
            clock,
            supply,
            results,
        }
    }

    /// Load questions for `config` and build a session ready to `start()`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` or `SessionError::LoadFailed`.
    pub async fn open_session<S: TickSource>(
        &self,
        config: ExamConfiguration,
        ticks: S,
    ) -> Result<ExamSession<S>, SessionError> {
        let questions = SessionQueries::load_questions(&config, self.supply.as_ref()).await?;
        let session = ExamSession::new(config, questions, self.clock.clone(), ticks)?;
        info!(
            session_id = %session.id(),
            questions = session.questions().len(),
            "exam session loaded"
        );
        Ok(session)
    }

    /// Submit the session, then store its result.
    ///
    /// # Errors
    ///
    /// Returns the submit error unchanged. A `PersistenceFailed` error leaves
    /// the session submitted; call [`ExamSessionService::persist_result`] to retry.
    pub async fn submit_and_persist<S: TickSource>(
        &self,
        session: &mut ExamSession<S>,
    ) -> Result<PersistedResult, SessionError> {
        let score = session.submit()?;
        let result_id = self.persist_result(session).await?;
        Ok(PersistedResult { result_id, score })
    }

    /// Store the result of a finished session once.
    ///
    /// Returns the existing id if the session was already persisted, and
    /// recovers the id when an earlier write landed but its reply was lost.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if the session has not
    /// finished, and `SessionError::PersistenceFailed` if the write fails.
    pub async fn persist_result<S: TickSource>(
        &self,
        session: &mut ExamSession<S>,
    ) -> Result<ResultId, SessionError> {
        if let Some(id) = session.result_id() {
            return Ok(id);
        }

        let Some(submission) = session.submission() else {
            return Err(SessionError::InvalidTransition {
                from: session.status(),
                action: "persist a result",
            });
        };

        let id = match self.results.append_result(submission).await {
            Ok(id) => id,
            Err(StorageError::Conflict) => self
                .results
                .find_result_id(submission.session_id())
                .await
                .map_err(SessionError::PersistenceFailed)?
                .ok_or(SessionError::PersistenceFailed(StorageError::Conflict))?,
            Err(err) => {
                warn!(session_id = %session.id(), error = %err, "exam result write failed");
                return Err(SessionError::PersistenceFailed(err));
            }
        };

        session.set_result_id(id);
        info!(session_id = %session.id(), result_id = id, "exam result stored");
        Ok(id)
    }

    /// [`ExamSessionService::persist_result`] with bounded retries.
    ///
    /// # Errors
    ///
    /// Returns the last `SessionError::PersistenceFailed` once attempts run
    /// out; other errors are returned immediately.
    pub async fn persist_with_retry<S: TickSource>(
        &self,
        session: &mut ExamSession<S>,
        policy: RetryPolicy,
    ) -> Result<ResultId, SessionError> {
        let attempts = policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.persist_result(session).await {
                Err(SessionError::PersistenceFailed(err)) if attempt < attempts => {
                    warn!(attempt, attempts, error = %err, "retrying exam result write");
                    tokio::time::sleep(policy.backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
