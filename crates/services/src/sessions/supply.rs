use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use exam_core::model::{ExamConfiguration, Question};
use storage::repository::{QuestionRepository, StorageError};

use super::plan::ExamPlanBuilder;

/// Source of the ordered question list for a new session.
#[async_trait]
pub trait QuestionSupply: Send + Sync {
    /// Resolve questions for `config`, ordered by part with passage groups
    /// kept together.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the underlying bank cannot be read.
    async fn resolve(&self, config: &ExamConfiguration) -> Result<Vec<Question>, StorageError>;
}

/// Supply backed by the question bank repository.
#[derive(Clone)]
pub struct BankQuestionSupply {
    questions: Arc<dyn QuestionRepository>,
    shuffle: bool,
    seed: Option<u64>,
}

impl BankQuestionSupply {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self {
            questions,
            shuffle: false,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[async_trait]
impl QuestionSupply for BankQuestionSupply {
    async fn resolve(&self, config: &ExamConfiguration) -> Result<Vec<Question>, StorageError> {
        let candidates = self
            .questions
            .list_candidates(config.exam_set_id(), config.selected_parts())
            .await?;

        let mut builder = ExamPlanBuilder::new(config).with_shuffle(self.shuffle);
        if let Some(seed) = self.seed {
            builder = builder.with_seed(seed);
        }
        let plan = builder.build(candidates);
        debug!(
            selected = plan.total(),
            groups_selected = plan.groups_selected,
            groups_available = plan.groups_available,
            "question plan built"
        );
        Ok(plan.questions)
    }
}
