use std::collections::BTreeSet;

use exam_core::TimeLeft;
use exam_core::model::{Question, QuestionId, SessionStatus};

/// Read-only view of a session for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub current_index: usize,
    pub total_questions: usize,
    pub time_left: TimeLeft,
    pub answered_count: usize,
    pub current_question: Question,
    pub selected_choice: Option<String>,
    pub flagged: BTreeSet<QuestionId>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_flagged(&self, question_id: QuestionId) -> bool {
        self.flagged.contains(&question_id)
    }

    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.total_questions.saturating_sub(self.answered_count)
    }

    /// Listening questions cannot be revisited once left.
    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.status == SessionStatus::Running
            && self.current_index > 0
            && !self.current_question.part().is_listening()
    }
}
