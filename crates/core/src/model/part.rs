use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartError {
    #[error("TOEIC part must be between 1 and 7, got {0}")]
    OutOfRange(u8),
}

/// One of the seven TOEIC sections.
///
/// Parts 1-4 are listening, parts 5-7 are reading. Listening parts are
/// presented forward-only inside a session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Part(u8);

impl Part {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 7;

    /// Validates and wraps a part number.
    ///
    /// # Errors
    ///
    /// Returns `PartError::OutOfRange` outside `1..=7`.
    pub fn new(number: u8) -> Result<Self, PartError> {
        if (Self::MIN..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(PartError::OutOfRange(number))
        }
    }

    #[must_use]
    pub fn number(self) -> u8 {
        self.0
    }

    /// True for the listening section (parts 1-4).
    #[must_use]
    pub fn is_listening(self) -> bool {
        self.0 <= 4
    }

    /// All seven parts in exam order.
    pub fn all() -> impl Iterator<Item = Part> {
        (Self::MIN..=Self::MAX).map(Part)
    }
}

impl TryFrom<u8> for Part {
    type Error = PartError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Part::new(value)
    }
}

impl From<Part> for u8 {
    fn from(part: Part) -> Self {
        part.0
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Part({})", self.0)
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Part {}", self.0)
    }
}
