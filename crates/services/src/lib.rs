#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod sessions;
pub mod timer;

pub use exam_core::Clock;
pub use sessions as session;

pub use app_services::ExamServices;
pub use error::{LoadFailure, ServicesInitError, SessionError};
pub use timer::{IntervalTicks, TickReceiver};

pub use sessions::{
    BankQuestionSupply, ExamSession, ExamSessionService, PersistedResult, QuestionSupply,
    ResultId, ResultListItem, ResultSummaryService, RetryPolicy, SessionSnapshot, SessionTick,
    SubscriptionId,
};
