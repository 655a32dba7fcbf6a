//! Pure scoring of a finished session.

use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Answer, Part, PartBreakdown, Question, QuestionId, ScoreResult, percent_half_up,
};

/// How time spent is derived for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAccounting {
    /// Countdown session: spent = limit - remaining at submission.
    Timed {
        limit_seconds: u32,
        remaining_seconds: u32,
    },
    /// Untimed session: wall-clock seconds since start.
    Untimed { elapsed_seconds: u64 },
}

impl TimeAccounting {
    #[must_use]
    pub fn time_spent_seconds(self) -> u64 {
        match self {
            TimeAccounting::Timed {
                limit_seconds,
                remaining_seconds,
            } => u64::from(limit_seconds.saturating_sub(remaining_seconds)),
            TimeAccounting::Untimed { elapsed_seconds } => elapsed_seconds,
        }
    }
}

/// Score `questions` against `answers`.
///
/// A question without an answer, or with a cleared choice, counts as
/// incorrect. Correctness is an exact match on the normalized choice.
#[must_use]
pub fn score(
    questions: &[Question],
    answers: &HashMap<QuestionId, Answer>,
    time: TimeAccounting,
) -> ScoreResult {
    score_with_parts(questions, answers, time, std::iter::empty())
}

/// Like [`score`], but every part in `parts` appears in the breakdown even
/// when no question belongs to it.
#[must_use]
pub fn score_with_parts(
    questions: &[Question],
    answers: &HashMap<QuestionId, Answer>,
    time: TimeAccounting,
    parts: impl IntoIterator<Item = Part>,
) -> ScoreResult {
    let mut per_part: BTreeMap<Part, PartBreakdown> = parts
        .into_iter()
        .map(|p| (p, PartBreakdown::default()))
        .collect();

    let mut correct_count = 0u32;
    let mut answered_count = 0u32;

    for question in questions {
        let selected = answers
            .get(&question.id())
            .and_then(|a| a.selected_choice.as_deref());
        let correct = selected.is_some_and(|choice| question.is_correct(choice));

        if selected.is_some() {
            answered_count += 1;
        }
        if correct {
            correct_count += 1;
        }

        let entry = per_part.entry(question.part()).or_default();
        entry.total += 1;
        if correct {
            entry.correct += 1;
        }
    }

    for breakdown in per_part.values_mut() {
        breakdown.accuracy = percent_half_up(breakdown.correct, breakdown.total);
    }

    let total_questions = u32::try_from(questions.len()).unwrap_or(u32::MAX);

    ScoreResult {
        total_questions,
        correct_count,
        answered_count,
        score_percent: percent_half_up(correct_count, total_questions),
        time_spent_seconds: time.time_spent_seconds(),
        per_part,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
