use thiserror::Error;

use crate::model::{ExamConfigError, PartError, QuestionError, SubmissionError};

/// Any validation failure raised while building exam domain values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    ExamConfig(#[from] ExamConfigError),
    #[error(transparent)]
    Part(#[from] PartError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}
