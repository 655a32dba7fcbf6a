mod answers;
mod machine;
mod observers;
mod plan;
mod queries;
mod snapshot;
mod supply;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{LoadFailure, SessionError};
pub use answers::AnswerStore;
pub use machine::{ExamSession, SessionTick};
pub use observers::{Observer, SubscriptionId};
pub use plan::{ExamPlan, ExamPlanBuilder};
pub use snapshot::SessionSnapshot;
pub use supply::{BankQuestionSupply, QuestionSupply};
pub use view::{ResultId, ResultListItem, ResultSummaryService};
pub use workflow::{ExamSessionService, PersistedResult, RetryPolicy};
