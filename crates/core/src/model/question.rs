use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    ids::{PassageId, QuestionId},
    part::Part,
};

/// Maximum number of answer choices a TOEIC question carries.
pub const MAX_CHOICES: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question must have at least one choice")]
    NoChoices,

    #[error("question has {count} choices, at most {MAX_CHOICES} allowed")]
    TooManyChoices { count: usize },

    #[error("choice text cannot be empty")]
    EmptyChoice,

    #[error("correct choice {0:?} is not one of the choices")]
    UnknownCorrectChoice(String),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice item, read-only for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    part: Part,
    prompt: String,
    choices: Vec<String>,
    correct_choice: String,
    passage_id: Option<PassageId>,
}

impl Question {
    /// Build a validated question.
    ///
    /// Choices and the correct choice are trimmed so that they compare the
    /// same way answers do.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the choice list is empty, longer than
    /// [`MAX_CHOICES`], has a blank entry, or does not contain the correct choice.
    pub fn new(
        id: QuestionId,
        part: Part,
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct_choice: impl Into<String>,
        passage_id: Option<PassageId>,
    ) -> Result<Self, QuestionError> {
        if choices.is_empty() {
            return Err(QuestionError::NoChoices);
        }
        if choices.len() > MAX_CHOICES {
            return Err(QuestionError::TooManyChoices {
                count: choices.len(),
            });
        }

        let choices: Vec<String> = choices
            .into_iter()
            .map(|c| normalize_choice(&c).to_owned())
            .collect();
        if choices.iter().any(String::is_empty) {
            return Err(QuestionError::EmptyChoice);
        }

        let correct_choice = normalize_choice(&correct_choice.into()).to_owned();
        if !choices.contains(&correct_choice) {
            return Err(QuestionError::UnknownCorrectChoice(correct_choice));
        }

        Ok(Self {
            id,
            part,
            prompt: prompt.into(),
            choices,
            correct_choice,
            passage_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn part(&self) -> Part {
        self.part
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn correct_choice(&self) -> &str {
        &self.correct_choice
    }

    #[must_use]
    pub fn passage_id(&self) -> Option<&PassageId> {
        self.passage_id.as_ref()
    }

    /// Returns the normalized form of `choice` if it is one of this question's choices.
    #[must_use]
    pub fn match_choice(&self, choice: &str) -> Option<&str> {
        let wanted = normalize_choice(choice);
        self.choices
            .iter()
            .find(|c| c.as_str() == wanted)
            .map(String::as_str)
    }

    /// Exact-match correctness check against a normalized choice.
    #[must_use]
    pub fn is_correct(&self, choice: &str) -> bool {
        self.correct_choice == choice
    }
}

/// Choice identifiers are compared after trimming surrounding whitespace only.
#[must_use]
pub fn normalize_choice(choice: &str) -> &str {
    choice.trim()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
