use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::{
    answer::Answer,
    exam::ExamConfiguration,
    ids::{ExamSetId, SessionId},
    score::ScoreResult,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("submitted_at is before started_at")]
    InvalidTimeRange,

    #[error("unknown termination reason: {0}")]
    UnknownTermination(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of an exam session.
///
/// `Submitted` and `Expired` are terminal and score identically; they differ
/// only in how the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    NotStarted,
    Running,
    Paused,
    Submitted,
    Expired,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Submitted | SessionStatus::Expired)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── TERMINATION ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    UserSubmitted,
    TimeExpired,
}

impl TerminationReason {
    /// Terminal status reached for this reason.
    #[must_use]
    pub fn terminal_status(self) -> SessionStatus {
        match self {
            TerminationReason::UserSubmitted => SessionStatus::Submitted,
            TerminationReason::TimeExpired => SessionStatus::Expired,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TerminationReason::UserSubmitted => "user_submitted",
            TerminationReason::TimeExpired => "time_expired",
        }
    }

    /// Parse the storage representation produced by [`TerminationReason::as_str`].
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::UnknownTermination` for any other string.
    pub fn parse(s: &str) -> Result<Self, SubmissionError> {
        match s {
            "user_submitted" => Ok(TerminationReason::UserSubmitted),
            "time_expired" => Ok(TerminationReason::TimeExpired),
            other => Err(SubmissionError::UnknownTermination(other.to_owned())),
        }
    }
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// Everything the result sink receives for a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    session_id: SessionId,
    config: ExamConfiguration,
    score: ScoreResult,
    answers: Vec<Answer>,
    started_at: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
    termination: TerminationReason,
}

impl Submission {
    /// Assemble a submission record.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::InvalidTimeRange` if `submitted_at < started_at`.
    pub fn new(
        session_id: SessionId,
        config: ExamConfiguration,
        score: ScoreResult,
        answers: Vec<Answer>,
        started_at: DateTime<Utc>,
        submitted_at: DateTime<Utc>,
        termination: TerminationReason,
    ) -> Result<Self, SubmissionError> {
        if submitted_at < started_at {
            return Err(SubmissionError::InvalidTimeRange);
        }
        Ok(Self {
            session_id,
            config,
            score,
            answers,
            started_at,
            submitted_at,
            termination,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn exam_set_id(&self) -> Option<ExamSetId> {
        self.config.exam_set_id()
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfiguration {
        &self.config
    }

    #[must_use]
    pub fn score(&self) -> &ScoreResult {
        &self.score
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn termination(&self) -> TerminationReason {
        self.termination
    }
}
