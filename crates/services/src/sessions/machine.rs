use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use exam_core::model::{
    ExamConfiguration, Question, QuestionId, ScoreResult, SessionId, SessionStatus, Submission,
    TerminationReason,
};
use exam_core::scorer;
use exam_core::{Clock, Countdown, CountdownTick, TickSource, TimeAccounting, TimeLeft};

use super::answers::AnswerStore;
use super::observers::{Observer, Observers, SubscriptionId};
use super::snapshot::SessionSnapshot;
use crate::error::{LoadFailure, SessionError};

/// Outcome of delivering one tick to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTick {
    /// Not running or not timed; the tick had no effect.
    Idle,
    Counting { remaining: u32 },
    /// Time ran out on this tick and the session was finalized.
    Expired(ScoreResult),
}

/// One student's attempt at a timed (or untimed) exam.
///
/// All operations take `&mut self`; ticks and user actions are serialized by
/// the owner. Rejected operations return an error and leave the session
/// unchanged.
pub struct ExamSession<S: TickSource> {
    id: SessionId,
    config: ExamConfiguration,
    questions: Vec<Question>,
    positions: HashMap<QuestionId, usize>,
    status: SessionStatus,
    current: usize,
    answers: AnswerStore,
    flags: BTreeSet<QuestionId>,
    countdown: Countdown<S>,
    clock: Clock,
    started_at: Option<DateTime<Utc>>,
    started_monotonic: Option<Duration>,
    submission: Option<Submission>,
    result_id: Option<i64>,
    observers: Observers,
}

impl<S: TickSource> ExamSession<S> {
    /// Build a session in `NotStarted` over an ordered question list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` for an invalid configuration and
    /// `SessionError::LoadFailed` for an empty list or duplicate question ids.
    pub fn new(
        config: ExamConfiguration,
        questions: Vec<Question>,
        clock: Clock,
        ticks: S,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if questions.is_empty() {
            return Err(SessionError::LoadFailed(LoadFailure::NoQuestions));
        }

        let mut positions = HashMap::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if positions.insert(question.id(), index).is_some() {
                return Err(SessionError::LoadFailed(LoadFailure::DuplicateQuestion(
                    question.id(),
                )));
            }
        }

        let countdown = match config.time_limit_seconds() {
            Some(seconds) => Countdown::limited(seconds, ticks),
            None => Countdown::unlimited(ticks),
        };

        Ok(Self {
            id: SessionId::generate(),
            config,
            questions,
            positions,
            status: SessionStatus::NotStarted,
            current: 0,
            answers: AnswerStore::new(),
            flags: BTreeSet::new(),
            countdown,
            clock,
            started_at: None,
            started_monotonic: None,
            submission: None,
            result_id: None,
            observers: Observers::new(),
        })
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfiguration {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn time_left(&self) -> TimeLeft {
        self.countdown.time_left()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.answered_count()
    }

    #[must_use]
    pub fn is_flagged(&self, question_id: QuestionId) -> bool {
        self.flags.contains(&question_id)
    }

    /// The final submission, present once the session is terminal.
    #[must_use]
    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    #[must_use]
    pub fn score(&self) -> Option<&ScoreResult> {
        self.submission.as_ref().map(Submission::score)
    }

    /// Id of the stored result, once persisted.
    #[must_use]
    pub fn result_id(&self) -> Option<i64> {
        self.result_id
    }

    pub(crate) fn set_result_id(&mut self, id: i64) {
        self.result_id = Some(id);
    }

    #[must_use]
    pub fn tick_source(&self) -> &S {
        self.countdown.source()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let current_question = self.current_question().clone();
        let selected_choice = self
            .answers
            .selected_choice(current_question.id())
            .map(str::to_owned);
        SessionSnapshot {
            status: self.status,
            current_index: self.current,
            total_questions: self.questions.len(),
            time_left: self.countdown.time_left(),
            answered_count: self.answers.answered_count(),
            current_question,
            selected_choice,
            flagged: self.flags.clone(),
        }
    }

    //
    // ─── OBSERVERS ─────────────────────────────────────────────────────────────────
    //

    pub fn subscribe(&mut self, observer: Observer) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn notify(&self) {
        if self.observers.is_empty() {
            return;
        }
        self.observers.notify(&self.snapshot());
    }

    //
    // ─── LIFECYCLE ─────────────────────────────────────────────────────────────────
    //

    /// Begin the attempt: arm the countdown (timed mode) and show question 0.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is `NotStarted`.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "start",
            });
        }

        let reading = self.clock.reading();
        if let Some(seconds) = self.config.time_limit_seconds() {
            self.countdown.arm(seconds);
        }
        self.started_at = Some(reading.wall);
        self.started_monotonic = Some(reading.monotonic);
        self.status = SessionStatus::Running;
        self.answers
            .focus(self.questions[self.current].id(), reading.monotonic);

        info!(
            session_id = %self.id,
            questions = self.questions.len(),
            mode = self.config.time_mode().as_str(),
            time_left = %self.countdown.time_left(),
            "exam session started"
        );
        self.notify();
        Ok(())
    }

    /// Freeze the countdown. A no-op for untimed sessions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` in a terminal state and
    /// `SessionError::InvalidTransition` unless the session is `Running`.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure_running("pause")?;
        if self.countdown.time_left().is_unlimited() {
            debug!(session_id = %self.id, "pause ignored for untimed session");
            return Ok(());
        }

        let at = self.clock.monotonic();
        self.countdown.disarm();
        self.answers.suspend(at);
        self.status = SessionStatus::Paused;
        debug!(session_id = %self.id, time_left = %self.countdown.time_left(), "session paused");
        self.notify();
        Ok(())
    }

    /// Continue from the frozen time left.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` in a terminal state and
    /// `SessionError::InvalidTransition` unless the session is `Paused`.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.ensure_not_terminal()?;
        if self.status == SessionStatus::Running && self.countdown.time_left().is_unlimited() {
            debug!(session_id = %self.id, "resume ignored for untimed session");
            return Ok(());
        }
        if self.status != SessionStatus::Paused {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "resume",
            });
        }

        let at = self.clock.monotonic();
        self.countdown.rearm();
        self.answers.focus(self.questions[self.current].id(), at);
        self.status = SessionStatus::Running;
        debug!(session_id = %self.id, time_left = %self.countdown.time_left(), "session resumed");
        self.notify();
        Ok(())
    }

    /// Submit the attempt and return its score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` if the session already ended
    /// and `SessionError::InvalidTransition` if it never started.
    pub fn submit(&mut self) -> Result<ScoreResult, SessionError> {
        self.ensure_not_terminal()?;
        if self.status == SessionStatus::NotStarted {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "submit",
            });
        }
        self.finalize(TerminationReason::UserSubmitted)
    }

    /// Deliver one countdown tick.
    pub fn tick(&mut self) -> SessionTick {
        if self.status != SessionStatus::Running {
            return SessionTick::Idle;
        }
        match self.countdown.tick() {
            CountdownTick::Ignored => SessionTick::Idle,
            CountdownTick::Counting { remaining } => {
                self.notify();
                SessionTick::Counting { remaining }
            }
            CountdownTick::Expired => match self.handle_expiry() {
                Some(score) => SessionTick::Expired(score),
                None => SessionTick::Idle,
            },
        }
    }

    /// Expiry signal handler. Finalizes a running session as `Expired` the
    /// first time its countdown has reached zero; every other delivery,
    /// including one while time is left or for an untimed session, returns
    /// `None`.
    pub fn handle_expiry(&mut self) -> Option<ScoreResult> {
        if self.status != SessionStatus::Running || !self.countdown.has_expired() {
            debug!(session_id = %self.id, status = %self.status, "expiry signal ignored");
            return None;
        }
        self.finalize(TerminationReason::TimeExpired).ok()
    }

    /// Release the tick source and all subscribers. Safe in any state.
    pub fn teardown(&mut self) {
        self.countdown.disarm();
        self.observers.clear();
        debug!(session_id = %self.id, status = %self.status, "session torn down");
    }

    fn finalize(&mut self, reason: TerminationReason) -> Result<ScoreResult, SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::AlreadySubmitted);
        }

        let reading = self.clock.reading();
        let started_at = self.started_at.unwrap_or(reading.wall);
        let submitted_at = reading.wall.max(started_at);
        let elapsed = reading
            .monotonic
            .saturating_sub(self.started_monotonic.unwrap_or(reading.monotonic));

        self.countdown.disarm();
        self.answers.suspend(reading.monotonic);

        let time = match (self.config.time_limit_seconds(), self.countdown.time_left()) {
            (Some(limit_seconds), TimeLeft::Limited(remaining_seconds)) => TimeAccounting::Timed {
                limit_seconds,
                remaining_seconds,
            },
            _ => TimeAccounting::Untimed {
                elapsed_seconds: elapsed.as_secs(),
            },
        };

        let score = scorer::score_with_parts(
            &self.questions,
            self.answers.as_map(),
            time,
            self.config.selected_parts().iter().copied(),
        );
        let submission = Submission::new(
            self.id,
            self.config.clone(),
            score.clone(),
            self.answers.ordered(&self.questions),
            started_at,
            submitted_at,
            reason,
        )?;

        self.status = reason.terminal_status();
        self.submission = Some(submission);
        info!(
            session_id = %self.id,
            reason = reason.as_str(),
            correct = score.correct_count,
            total = score.total_questions,
            score_percent = score.score_percent,
            time_spent_seconds = score.time_spent_seconds,
            "exam session finalized"
        );
        self.notify();
        Ok(score)
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────────
    //

    /// Record `choice` for a question. Matching trims surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQuestion`, `InvalidChoice` or `NavigationLocked`, and
    /// the state errors of a non-running session.
    pub fn select_answer(
        &mut self,
        question_id: QuestionId,
        choice: &str,
    ) -> Result<(), SessionError> {
        self.ensure_running("select an answer")?;
        let position = self.position_of(question_id)?;
        let normalized = self.questions[position]
            .match_choice(choice)
            .map(str::to_owned)
            .ok_or_else(|| SessionError::InvalidChoice {
                question_id,
                choice: choice.to_owned(),
            })?;
        self.ensure_not_locked(position)?;

        let at = self.clock.monotonic();
        self.answers.select(question_id, normalized, at);
        debug!(session_id = %self.id, %question_id, "answer selected");
        self.notify();
        Ok(())
    }

    /// Clear the choice for a question, keeping its elapsed time.
    ///
    /// # Errors
    ///
    /// Same as [`ExamSession::select_answer`], minus `InvalidChoice`.
    pub fn clear_answer(&mut self, question_id: QuestionId) -> Result<(), SessionError> {
        self.ensure_running("clear an answer")?;
        let position = self.position_of(question_id)?;
        self.ensure_not_locked(position)?;

        let at = self.clock.monotonic();
        self.answers.clear(question_id, at);
        debug!(session_id = %self.id, %question_id, "answer cleared");
        self.notify();
        Ok(())
    }

    /// Flip the review flag on a question and return the new state.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQuestion`, or a state error unless running or paused.
    pub fn toggle_flag(&mut self, question_id: QuestionId) -> Result<bool, SessionError> {
        self.ensure_not_terminal()?;
        if self.status == SessionStatus::NotStarted {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "flag a question",
            });
        }
        self.position_of(question_id)?;

        let flagged = if self.flags.remove(&question_id) {
            false
        } else {
            self.flags.insert(question_id);
            true
        };
        self.notify();
        Ok(flagged)
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────────
    //

    /// Jump to `index`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an index outside the question list and
    /// `NavigationLocked` for a backward move inside a listening part.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_running("navigate")?;
        let len = self.questions.len();
        if index >= len {
            return Err(SessionError::OutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len,
            });
        }
        self.ensure_not_locked(index)?;
        if index == self.current {
            return Ok(());
        }

        let at = self.clock.monotonic();
        self.current = index;
        self.answers.focus(self.questions[index].id(), at);
        debug!(session_id = %self.id, index, "moved to question");
        self.notify();
        Ok(())
    }

    /// Move forward one question.
    ///
    /// # Errors
    ///
    /// See [`ExamSession::go_to`].
    pub fn next(&mut self) -> Result<(), SessionError> {
        self.go_to(self.current.saturating_add(1))
    }

    /// Move back one question.
    ///
    /// # Errors
    ///
    /// Returns `NavigationLocked` in a listening part and `OutOfRange` on the
    /// first question.
    pub fn previous(&mut self) -> Result<(), SessionError> {
        self.ensure_running("navigate")?;
        let part = self.current_question().part();
        if part.is_listening() {
            return Err(SessionError::NavigationLocked { part });
        }
        match self.current.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => Err(SessionError::OutOfRange {
                index: -1,
                len: self.questions.len(),
            }),
        }
    }

    //
    // ─── GUARDS ────────────────────────────────────────────────────────────────────
    //

    fn ensure_not_terminal(&self) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::AlreadySubmitted);
        }
        Ok(())
    }

    fn ensure_running(&self, action: &'static str) -> Result<(), SessionError> {
        self.ensure_not_terminal()?;
        if self.status != SessionStatus::Running {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action,
            });
        }
        Ok(())
    }

    fn position_of(&self, question_id: QuestionId) -> Result<usize, SessionError> {
        self.positions
            .get(&question_id)
            .copied()
            .ok_or(SessionError::UnknownQuestion(question_id))
    }

    // Listening parts are forward-only, judged by the part being shown.
    fn ensure_not_locked(&self, target: usize) -> Result<(), SessionError> {
        let part = self.current_question().part();
        if target < self.current && part.is_listening() {
            return Err(SessionError::NavigationLocked { part });
        }
        Ok(())
    }
}

impl<S: TickSource> fmt::Debug for ExamSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("current", &self.current)
            .field("questions", &self.questions.len())
            .field("countdown", &self.countdown)
            .field("result_id", &self.result_id)
            .finish_non_exhaustive()
    }
}
