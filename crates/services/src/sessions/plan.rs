use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{SeedableRng, rng};
use std::collections::{BTreeMap, HashMap};

use exam_core::model::{ExamConfiguration, Part, PassageId, Question};

/// Selection result for one exam attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamPlan {
    pub questions: Vec<Question>,
    pub groups_selected: usize,
    pub groups_available: usize,
}

impl ExamPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Picks whole passage groups from a candidate pool.
///
/// Groups are taken round-robin across the selected parts until the
/// configured question count is reached; a group that would overshoot the
/// count is skipped in favor of a smaller one. The resulting list is ordered
/// by part, and questions sharing a passage stay contiguous.
pub struct ExamPlanBuilder<'a> {
    config: &'a ExamConfiguration,
    shuffle: bool,
    seed: Option<u64>,
}

impl<'a> ExamPlanBuilder<'a> {
    #[must_use]
    pub fn new(config: &'a ExamConfiguration) -> Self {
        Self {
            config,
            shuffle: false,
            seed: None,
        }
    }

    /// Shuffle group order within each part before selection.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Use a deterministic shuffle.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self, candidates: impl IntoIterator<Item = Question>) -> ExamPlan {
        let target = usize::try_from(self.config.question_count()).unwrap_or(usize::MAX);
        let mut by_part = group_by_part(
            candidates
                .into_iter()
                .filter(|q| self.config.selected_parts().contains(&q.part())),
        );
        let groups_available = by_part.values().map(Vec::len).sum();

        if self.shuffle {
            match self.seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    for groups in by_part.values_mut() {
                        groups.shuffle(&mut rng);
                    }
                }
                None => {
                    let mut rng = rng();
                    for groups in by_part.values_mut() {
                        groups.shuffle(&mut rng);
                    }
                }
            }
        }

        let mut selected: BTreeMap<Part, Vec<Question>> = BTreeMap::new();
        let mut taken = 0usize;
        let mut groups_selected = 0usize;
        loop {
            let mut progressed = false;
            for (part, groups) in &mut by_part {
                if taken >= target {
                    break;
                }
                let Some(pos) = groups.iter().position(|g| taken + g.len() <= target) else {
                    continue;
                };
                let group = groups.remove(pos);
                taken += group.len();
                groups_selected += 1;
                selected.entry(*part).or_default().extend(group);
                progressed = true;
            }
            if !progressed || taken >= target {
                break;
            }
        }

        ExamPlan {
            questions: selected.into_values().flatten().collect(),
            groups_selected,
            groups_available,
        }
    }
}

/// Split questions into passage groups per part, keeping first-seen order.
/// A question without a passage is a group of one.
fn group_by_part(questions: impl Iterator<Item = Question>) -> BTreeMap<Part, Vec<Vec<Question>>> {
    let mut by_part: BTreeMap<Part, Vec<Vec<Question>>> = BTreeMap::new();
    let mut passage_slots: HashMap<(Part, PassageId), usize> = HashMap::new();

    for question in questions {
        let part = question.part();
        let groups = by_part.entry(part).or_default();
        match question.passage_id().cloned() {
            Some(passage) => match passage_slots.get(&(part, passage.clone())) {
                Some(&slot) => groups[slot].push(question),
                None => {
                    passage_slots.insert((part, passage), groups.len());
                    groups.push(vec![question]);
                }
            },
            None => groups.push(vec![question]),
        }
    }
    by_part
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::QuestionId;

    fn q(id: u64, part: u8, passage: Option<&str>) -> Question {
        Question::new(
            QuestionId::new(id),
            Part::new(part).unwrap(),
            format!("Q{id}"),
            vec!["A".into(), "B".into(), "C".into()],
            "A",
            passage.map(PassageId::new),
        )
        .unwrap()
    }

    fn ids(plan: &ExamPlan) -> Vec<u64> {
        plan.questions.iter().map(|q| q.id().value()).collect()
    }

    #[test]
    fn takes_groups_round_robin_across_parts() {
        let config = ExamConfiguration::standard([5, 7], 4, 10).unwrap();
        let candidates = vec![
            q(1, 5, None),
            q(2, 5, None),
            q(3, 5, None),
            q(10, 7, Some("email")),
            q(11, 7, Some("email")),
            q(12, 7, None),
        ];
        let plan = ExamPlanBuilder::new(&config).build(candidates);
        assert_eq!(ids(&plan), vec![1, 2, 10, 11]);
        assert_eq!(plan.groups_selected, 3);
        assert_eq!(plan.groups_available, 5);
    }

    #[test]
    fn never_splits_a_passage_group() {
        let config = ExamConfiguration::standard([6], 2, 10).unwrap();
        let candidates = vec![
            q(1, 6, Some("memo")),
            q(2, 6, Some("memo")),
            q(3, 6, Some("memo")),
            q(4, 6, None),
        ];
        let plan = ExamPlanBuilder::new(&config).build(candidates);
        assert_eq!(ids(&plan), vec![4]);
    }

    #[test]
    fn scattered_passage_members_end_up_together() {
        let config = ExamConfiguration::standard([3], 10, 10).unwrap();
        let candidates = vec![
            q(1, 3, Some("talk")),
            q(2, 3, None),
            q(3, 3, Some("talk")),
        ];
        let plan = ExamPlanBuilder::new(&config).build(candidates);
        assert_eq!(ids(&plan), vec![1, 3, 2]);
    }

    #[test]
    fn drops_unselected_parts() {
        let config = ExamConfiguration::standard([5], 10, 10).unwrap();
        let plan = ExamPlanBuilder::new(&config).build(vec![q(1, 5, None), q(2, 1, None)]);
        assert_eq!(ids(&plan), vec![1]);
    }

    #[test]
    fn seeded_shuffle_is_deterministic_and_keeps_part_order() {
        let config = ExamConfiguration::standard([5, 6], 20, 10).unwrap();
        let candidates: Vec<Question> = (1..=8)
            .map(|id| q(id, 5, None))
            .chain((9..=12).map(|id| q(id, 6, Some("letter"))))
            .collect();

        let first = ExamPlanBuilder::new(&config)
            .with_shuffle(true)
            .with_seed(7)
            .build(candidates.clone());
        let second = ExamPlanBuilder::new(&config)
            .with_shuffle(true)
            .with_seed(7)
            .build(candidates);
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.total(), 12);
        assert!(first.questions[..8].iter().all(|q| q.part().number() == 5));
        assert_eq!(&ids(&first)[8..], &[9, 10, 11, 12]);
    }

    #[test]
    fn empty_pool_gives_empty_plan() {
        let config = ExamConfiguration::unlimited([7], 5).unwrap();
        let plan = ExamPlanBuilder::new(&config).build(Vec::new());
        assert!(plan.is_empty());
    }
}
