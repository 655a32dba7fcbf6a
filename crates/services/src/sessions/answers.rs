use std::collections::HashMap;
use std::time::Duration;

use exam_core::model::{Answer, Question, QuestionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Focus {
    question_id: QuestionId,
    since: Duration,
}

/// Latest answer and accumulated viewing time per question.
///
/// Every `at` argument is a monotonic clock reading. Time is attributed to the focused question. It is added to that
/// question's `Answer` when an answer is selected or when focus moves away;
/// time spent on a question that has no `Answer` yet is not recorded.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    answers: HashMap<QuestionId, Answer>,
    focus: Option<Focus>,
}

fn millis_between(from: Duration, to: Duration) -> u64 {
    u64::try_from(to.saturating_sub(from).as_millis()).unwrap_or(u64::MAX)
}

impl AnswerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move focus to `question_id`, crediting the previously focused question.
    pub fn focus(&mut self, question_id: QuestionId, at: Duration) {
        self.flush(at);
        self.focus = Some(Focus {
            question_id,
            since: at,
        });
    }

    /// Credit the focused question and stop timing until the next `focus`.
    pub fn suspend(&mut self, at: Duration) {
        self.flush(at);
        self.focus = None;
    }

    #[must_use]
    pub fn focused(&self) -> Option<QuestionId> {
        self.focus.map(|f| f.question_id)
    }

    /// Record `choice` (already normalized) for `question_id`.
    pub fn select(&mut self, question_id: QuestionId, choice: String, at: Duration) -> &Answer {
        self.upsert(question_id, Some(choice), at)
    }

    /// Clear the choice but keep the answer and its elapsed time.
    pub fn clear(&mut self, question_id: QuestionId, at: Duration) -> &Answer {
        self.upsert(question_id, None, at)
    }

    fn upsert(
        &mut self,
        question_id: QuestionId,
        choice: Option<String>,
        at: Duration,
    ) -> &Answer {
        let delta = match &mut self.focus {
            Some(focus) if focus.question_id == question_id => {
                let delta = millis_between(focus.since, at);
                focus.since = at;
                delta
            }
            _ => 0,
        };

        let answer = self
            .answers
            .entry(question_id)
            .or_insert_with(|| Answer::new(question_id));
        answer.selected_choice = choice;
        answer.elapsed_ms = answer.elapsed_ms.saturating_add(delta);
        answer
    }

    fn flush(&mut self, at: Duration) {
        let Some(focus) = &mut self.focus else {
            return;
        };
        let delta = millis_between(focus.since, at);
        focus.since = at;
        if let Some(answer) = self.answers.get_mut(&focus.question_id) {
            answer.elapsed_ms = answer.elapsed_ms.saturating_add(delta);
        }
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn selected_choice(&self, question_id: QuestionId) -> Option<&str> {
        self.get(question_id)
            .and_then(|a| a.selected_choice.as_deref())
    }

    /// Number of questions with a selected choice.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| a.is_answered()).count()
    }

    #[must_use]
    pub fn as_map(&self) -> &HashMap<QuestionId, Answer> {
        &self.answers
    }

    /// Answers in question order, skipping questions never interacted with.
    #[must_use]
    pub fn ordered(&self, questions: &[Question]) -> Vec<Answer> {
        questions
            .iter()
            .filter_map(|q| self.answers.get(&q.id()).cloned())
            .collect()
    }
}
