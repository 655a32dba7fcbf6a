use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::{
    ids::ExamSetId,
    part::{Part, PartError},
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamConfigError {
    #[error("at least one part must be selected")]
    NoParts,

    #[error(transparent)]
    InvalidPart(#[from] PartError),

    #[error("question count must be >= 1")]
    InvalidQuestionCount,

    #[error("time limit must be >= 1 minute in standard mode")]
    InvalidTimeLimit,
}

//
// ─── TIME MODE ─────────────────────────────────────────────────────────────────
//

/// Whether a session runs under a countdown or without an enforced limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeMode {
    Standard,
    Unlimited,
}

impl TimeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimeMode::Standard => "standard",
            TimeMode::Unlimited => "unlimited",
        }
    }
}

//
// ─── CONFIGURATION ─────────────────────────────────────────────────────────────
//

/// Parameters chosen before a session starts. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfiguration {
    exam_set_id: Option<ExamSetId>,
    selected_parts: BTreeSet<Part>,
    question_count: u32,
    time_limit_minutes: u32,
    time_mode: TimeMode,
}

impl ExamConfiguration {
    /// Build a validated configuration from raw part numbers.
    ///
    /// # Errors
    ///
    /// Returns `ExamConfigError` if no parts are selected, a part is outside
    /// `1..=7`, `question_count` is zero, or a standard session has no time.
    pub fn new(
        exam_set_id: Option<ExamSetId>,
        parts: impl IntoIterator<Item = u8>,
        question_count: u32,
        time_limit_minutes: u32,
        time_mode: TimeMode,
    ) -> Result<Self, ExamConfigError> {
        let selected_parts = parts
            .into_iter()
            .map(Part::new)
            .collect::<Result<BTreeSet<_>, _>>()?;

        let config = Self {
            exam_set_id,
            selected_parts,
            question_count,
            time_limit_minutes,
            time_mode,
        };
        config.validate()?;
        Ok(config)
    }

    /// Timed configuration over the given parts.
    ///
    /// # Errors
    ///
    /// See [`ExamConfiguration::new`].
    pub fn standard(
        parts: impl IntoIterator<Item = u8>,
        question_count: u32,
        time_limit_minutes: u32,
    ) -> Result<Self, ExamConfigError> {
        Self::new(
            None,
            parts,
            question_count,
            time_limit_minutes,
            TimeMode::Standard,
        )
    }

    /// Untimed configuration over the given parts.
    ///
    /// # Errors
    ///
    /// See [`ExamConfiguration::new`].
    pub fn unlimited(
        parts: impl IntoIterator<Item = u8>,
        question_count: u32,
    ) -> Result<Self, ExamConfigError> {
        Self::new(None, parts, question_count, 0, TimeMode::Unlimited)
    }

    #[must_use]
    pub fn with_exam_set(mut self, exam_set_id: ExamSetId) -> Self {
        self.exam_set_id = Some(exam_set_id);
        self
    }

    /// Re-check invariants, e.g. after deserializing a persisted configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as `ExamConfigError`.
    pub fn validate(&self) -> Result<(), ExamConfigError> {
        if self.selected_parts.is_empty() {
            return Err(ExamConfigError::NoParts);
        }
        if self.question_count == 0 {
            return Err(ExamConfigError::InvalidQuestionCount);
        }
        if self.time_mode == TimeMode::Standard && self.time_limit_minutes == 0 {
            return Err(ExamConfigError::InvalidTimeLimit);
        }
        Ok(())
    }

    #[must_use]
    pub fn exam_set_id(&self) -> Option<ExamSetId> {
        self.exam_set_id
    }

    #[must_use]
    pub fn selected_parts(&self) -> &BTreeSet<Part> {
        &self.selected_parts
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn time_mode(&self) -> TimeMode {
        self.time_mode
    }

    /// Countdown length in seconds; `None` for unlimited sessions.
    #[must_use]
    pub fn time_limit_seconds(&self) -> Option<u32> {
        match self.time_mode {
            TimeMode::Standard => Some(self.time_limit_minutes.saturating_mul(60)),
            TimeMode::Unlimited => None,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
