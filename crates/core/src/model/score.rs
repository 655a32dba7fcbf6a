use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::part::Part;

/// Per-part tally inside a [`ScoreResult`].
///
/// `accuracy` is an integer percentage, rounded half-up, and `0` for a part
/// with no questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartBreakdown {
    pub total: u32,
    pub correct: u32,
    pub accuracy: u32,
}

/// Final score of a session. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_questions: u32,
    pub correct_count: u32,
    pub answered_count: u32,
    pub score_percent: u32,
    pub time_spent_seconds: u64,
    pub per_part: BTreeMap<Part, PartBreakdown>,
}

impl ScoreResult {
    #[must_use]
    pub fn part(&self, part: Part) -> Option<&PartBreakdown> {
        self.per_part.get(&part)
    }

    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.total_questions.saturating_sub(self.correct_count)
    }
}

/// `numerator / denominator * 100`, rounded half-up; `0` when the denominator is zero.
#[must_use]
pub fn percent_half_up(numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let num = u64::from(numerator) * 200 + u64::from(denominator);
    let den = u64::from(denominator) * 2;
    u32::try_from(num / den).unwrap_or(u32::MAX)
}
