use std::collections::HashMap;
use tracing::warn;

use exam_core::model::{ExamConfiguration, PassageId, Question};

use super::supply::QuestionSupply;
use crate::error::{LoadFailure, SessionError};

/// Supply-backed loading for new sessions.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Resolve and sanitize the question list for `config`.
    ///
    /// Questions outside the selected parts are dropped and passage members
    /// that arrive scattered are pulled together behind their first member.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` for an invalid configuration and
    /// `SessionError::LoadFailed` when the supply fails or yields nothing.
    pub async fn load_questions(
        config: &ExamConfiguration,
        supply: &dyn QuestionSupply,
    ) -> Result<Vec<Question>, SessionError> {
        config.validate()?;
        let resolved = supply
            .resolve(config)
            .await
            .map_err(|err| SessionError::LoadFailed(LoadFailure::Supply(err)))?;

        let total = resolved.len();
        let kept: Vec<Question> = resolved
            .into_iter()
            .filter(|q| config.selected_parts().contains(&q.part()))
            .collect();
        if kept.len() != total {
            warn!(
                dropped = total - kept.len(),
                "supply returned questions outside the selected parts"
            );
        }

        let questions = regroup_passages(kept);
        if questions.is_empty() {
            return Err(SessionError::LoadFailed(LoadFailure::NoQuestions));
        }
        let expected = usize::try_from(config.question_count()).unwrap_or(usize::MAX);
        if questions.len() < expected {
            warn!(
                expected,
                available = questions.len(),
                "question bank is short for the requested count"
            );
        }
        Ok(questions)
    }
}

/// Stable regroup: each passage's members follow its first member, everything
/// else keeps its relative order.
fn regroup_passages(questions: Vec<Question>) -> Vec<Question> {
    let mut groups: Vec<Vec<Question>> = Vec::with_capacity(questions.len());
    let mut slots: HashMap<PassageId, usize> = HashMap::new();
    let mut moved = false;

    for question in questions {
        let Some(passage) = question.passage_id().cloned() else {
            groups.push(vec![question]);
            continue;
        };
        match slots.get(&passage) {
            Some(&slot) => {
                moved |= slot + 1 != groups.len();
                groups[slot].push(question);
            }
            None => {
                slots.insert(passage, groups.len());
                groups.push(vec![question]);
            }
        }
    }

    if moved {
        warn!("passage members were not contiguous and have been regrouped");
    }
    groups.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use exam_core::model::{Part, QuestionId};
    use storage::repository::StorageError;

    fn q(id: u64, part: u8, passage: Option<&str>) -> Question {
        Question::new(
            QuestionId::new(id),
            Part::new(part).unwrap(),
            format!("Q{id}"),
            vec!["A".into(), "B".into()],
            "A",
            passage.map(PassageId::new),
        )
        .unwrap()
    }

    struct FixedSupply(Result<Vec<Question>, ()>);

    #[async_trait]
    impl QuestionSupply for FixedSupply {
        async fn resolve(
            &self,
            _config: &ExamConfiguration,
        ) -> Result<Vec<Question>, StorageError> {
            self.0
                .clone()
                .map_err(|()| StorageError::Connection("bank offline".into()))
        }
    }

    fn config() -> ExamConfiguration {
        ExamConfiguration::standard([3, 5], 5, 10).unwrap()
    }

    #[tokio::test]
    async fn supply_errors_become_load_failed() {
        let err = SessionQueries::load_questions(&config(), &FixedSupply(Err(())))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::LoadFailed(LoadFailure::Supply(StorageError::Connection(_)))
        ));
    }

    #[tokio::test]
    async fn empty_supply_is_load_failed() {
        let err = SessionQueries::load_questions(&config(), &FixedSupply(Ok(Vec::new())))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::LoadFailed(LoadFailure::NoQuestions)
        ));
    }

    #[tokio::test]
    async fn foreign_parts_are_dropped_and_passages_regrouped() {
        let supply = FixedSupply(Ok(vec![
            q(1, 3, Some("talk")),
            q(2, 3, None),
            q(3, 1, None),
            q(4, 3, Some("talk")),
            q(5, 5, None),
        ]));
        let questions = SessionQueries::load_questions(&config(), &supply)
            .await
            .unwrap();
        let ids: Vec<u64> = questions.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 4, 2, 5]);
    }

    #[tokio::test]
    async fn only_foreign_parts_is_load_failed() {
        let supply = FixedSupply(Ok(vec![q(1, 1, None)]));
        let err = SessionQueries::load_questions(&config(), &supply)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::LoadFailed(LoadFailure::NoQuestions)
        ));
    }
}
