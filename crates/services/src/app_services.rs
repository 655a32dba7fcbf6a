use std::sync::Arc;

use storage::repository::{QuestionRepository, Storage};

use crate::Clock;
use crate::error::ServicesInitError;
use crate::sessions::{BankQuestionSupply, ExamSessionService, ResultSummaryService};

/// Assembles the services the exam shell needs.
#[derive(Clone)]
pub struct ExamServices {
    questions: Arc<dyn QuestionRepository>,
    sessions: Arc<ExamSessionService>,
    results: Arc<ResultSummaryService>,
}

impl ExamServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `ServicesInitError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        shuffle: bool,
    ) -> Result<Self, ServicesInitError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, shuffle))
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock, false)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, shuffle: bool) -> Self {
        let supply = BankQuestionSupply::new(Arc::clone(&storage.questions)).with_shuffle(shuffle);
        let sessions = Arc::new(ExamSessionService::new(
            clock,
            Arc::new(supply),
            Arc::clone(&storage.results),
        ));
        let results = Arc::new(ResultSummaryService::new(Arc::clone(&storage.results)));
        Self {
            questions: storage.questions,
            sessions,
            results,
        }
    }

    /// Question bank, for seeding and maintenance.
    #[must_use]
    pub fn questions(&self) -> Arc<dyn QuestionRepository> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultSummaryService> {
        Arc::clone(&self.results)
    }
}
