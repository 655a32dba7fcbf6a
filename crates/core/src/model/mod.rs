mod answer;
mod exam;
mod ids;
mod part;
mod question;
mod score;
mod session;

pub use answer::Answer;
pub use exam::{ExamConfigError, ExamConfiguration, TimeMode};
pub use ids::{ExamSetId, ParseIdError, PassageId, QuestionId, SessionId};
pub use part::{Part, PartError};
pub use question::{MAX_CHOICES, Question, QuestionError, normalize_choice};
pub use score::{PartBreakdown, ScoreResult, percent_half_up};
pub use session::{SessionStatus, Submission, SubmissionError, TerminationReason};
