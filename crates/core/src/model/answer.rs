use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// The student's latest response to a question.
///
/// Created on first interaction and kept for the rest of the session even if
/// the choice is later cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub selected_choice: Option<String>,
    pub elapsed_ms: u64,
}

impl Answer {
    #[must_use]
    pub fn new(question_id: QuestionId) -> Self {
        Self {
            question_id,
            selected_choice: None,
            elapsed_ms: 0,
        }
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.selected_choice.is_some()
    }
}
