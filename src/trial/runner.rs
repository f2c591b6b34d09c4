//! Greedy placement loop of a single trial.
//!
//! # Algorithm
//!
//! 1. Ask the strategy for this trial's topic order.
//! 2. For each topic, in that order:
//!    a. Find the biggest open slot; stop the topic if it is full.
//!    b. Collect open applications for the topic that fit the slot,
//!       grouped by collection.
//!    c. Stop the topic if there are none; otherwise let the strategy
//!       pick one, accept it and place it. Repeat from (a).
//! 3. Score the resulting state.
//!
//! Topics are visited once. Placements in a later topic may free
//! candidates for an earlier one; the trial does not go back.
//!
//! # Termination
//! Every inner iteration removes at least one application from the open
//! pool, and the topic list is finite.

use std::time::{Duration, Instant};

use super::{PlacementStrategy, TrialState};
use crate::error::{TrialError, TrialResult};
use crate::models::{Application, CollectionKey, MultiMap, Topic};
use crate::snapshot::Snapshot;

/// Result of one completed trial.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    /// Index of the trial within its run.
    pub trial_index: usize,
    /// Final state.
    pub state: TrialState,
    /// [`TrialState::score`] of `state`.
    pub score: i64,
    /// Applications placed by this trial.
    pub placements: usize,
    /// Wall time of the trial.
    pub elapsed: Duration,
}

/// Runs trials against one shared snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TrialRunner<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> TrialRunner<'a> {
    /// Creates a runner for the snapshot.
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Runs one trial with the given strategy.
    ///
    /// # Errors
    /// Any [`TrialError`] from the state; the strategy named an unknown
    /// topic or picked something that cannot be placed.
    pub fn run<S>(&self, strategy: &mut S, trial_index: usize) -> TrialResult<TrialOutcome>
    where
        S: PlacementStrategy + ?Sized,
    {
        let started = Instant::now();
        let mut state = TrialState::from_snapshot(self.snapshot);
        let mut placements = 0;

        let order = strategy.topic_visit_order(self.snapshot.topics(), trial_index);
        for topic_id in order {
            let topic = self
                .snapshot
                .topic(topic_id)
                .ok_or(TrialError::UnknownTopic(topic_id))?;
            placements += fill_topic(&mut state, topic, strategy, trial_index)?;
        }

        let score = state.score();
        Ok(TrialOutcome {
            trial_index,
            state,
            score,
            placements,
            elapsed: started.elapsed(),
        })
    }
}

/// Fills one topic until it is full or has no fitting candidate.
fn fill_topic<S>(
    state: &mut TrialState,
    topic: &Topic,
    strategy: &mut S,
    trial_index: usize,
) -> TrialResult<usize>
where
    S: PlacementStrategy + ?Sized,
{
    let mut placed = 0;
    loop {
        let open_slot = state.biggest_open_slot(topic);
        if open_slot.is_full() {
            break;
        }
        let mut candidates = candidates(state, topic, open_slot.capacity);
        let Some(application) = strategy.pick_next(&mut candidates, trial_index) else {
            break;
        };
        state.place(application, open_slot.slot_id)?;
        placed += 1;
    }
    Ok(placed)
}

/// Open applications for the topic with `size <= capacity`, by collection.
fn candidates(
    state: &TrialState,
    topic: &Topic,
    capacity: u32,
) -> MultiMap<CollectionKey, Application> {
    state
        .open()
        .for_topic(topic.id)
        .iter()
        .filter(|a| a.size <= capacity)
        .map(|a| (a.collection_key(), *a))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OpenPool, Term, TopicId};
    use crate::scoring::{score_for_assigned, UNASSIGNED_PENALTY};
    use crate::trial::RotationStrategy;
    use crate::validation::validate_trial;
    use std::collections::{BTreeMap, HashMap};

    fn snapshot(topics: Vec<Topic>, apps: Vec<Application>) -> Snapshot {
        Snapshot::new(
            Term::new(1, "WS 2026"),
            false,
            topics,
            BTreeMap::new(),
            apps.into_iter().collect::<OpenPool>(),
        )
    }

    /// Visits topics in the given order and always picks the first candidate.
    struct Scripted(Vec<TopicId>);

    impl PlacementStrategy for Scripted {
        fn topic_visit_order(&mut self, _: &[Topic], _: usize) -> Vec<TopicId> {
            self.0.clone()
        }

        fn pick_next(
            &mut self,
            candidates: &mut MultiMap<CollectionKey, Application>,
            _: usize,
        ) -> Option<Application> {
            let first = candidates.values().next().copied()?;
            candidates.remove(&first.collection_key());
            Some(first)
        }
    }

    #[test]
    fn test_two_groups_fill_one_slot() {
        let snap = snapshot(
            vec![Topic::new(1).with_slots(1).with_slot_size(1, 5)],
            vec![
                Application::new(1, 1, 1, 1).with_size(3).with_priority(1),
                Application::new(2, 2, 1, 1).with_size(2).with_priority(2),
            ],
        );
        for trial in 0..8 {
            let mut strategy = RotationStrategy::from_seed(trial as u64);
            let outcome = TrialRunner::new(&snap).run(&mut strategy, trial).unwrap();
            assert_eq!(outcome.placements, 2);
            assert_eq!(outcome.score, score_for_assigned(1) + score_for_assigned(2));
            assert_eq!(outcome.score, 39);
        }
    }

    #[test]
    fn test_only_one_fits() {
        let snap = snapshot(
            vec![Topic::new(1).with_slots(1).with_slot_size(1, 5)],
            vec![
                Application::new(1, 1, 1, 1).with_size(4).with_priority(1),
                Application::new(2, 2, 1, 1).with_size(4).with_priority(2),
            ],
        );

        // Offset 0, trial 0 picks the first representative; trial 1 the second.
        let mut s = RotationStrategy::from_seed(0).with_offset(0);
        let first = TrialRunner::new(&snap).run(&mut s, 0).unwrap();
        assert_eq!(first.placements, 1);
        assert_eq!(first.score, 20 + UNASSIGNED_PENALTY);
        assert_eq!(first.state.accepted().next().map(|a| a.id), Some(1));

        let second = TrialRunner::new(&snap).run(&mut s, 1).unwrap();
        assert_eq!(second.score, 19 + UNASSIGNED_PENALTY);
        assert_eq!(second.state.accepted().next().map(|a| a.id), Some(2));
    }

    #[test]
    fn test_accepting_removes_siblings_in_other_topics() {
        let snap = snapshot(
            vec![
                Topic::new(1).with_slots(1).with_slot_size(1, 5),
                Topic::new(2).with_slots(1).with_slot_size(1, 5),
            ],
            vec![
                Application::new(1, 5, 1, 1).with_size(2),
                Application::new(2, 5, 1, 2).with_size(2).with_priority(2),
            ],
        );
        let outcome = TrialRunner::new(&snap)
            .run(&mut Scripted(vec![1, 2]), 0)
            .unwrap();

        assert_eq!(outcome.placements, 1);
        assert!(outcome.state.open().is_empty());
        assert!(outcome.state.slots_for(2).is_empty());
        assert_eq!(outcome.score, 20);
    }

    #[test]
    fn test_single_forward_pass() {
        // Group 1 picks topic 1 first, so topic 2 only gets group 2.
        let snap = snapshot(
            vec![
                Topic::new(1).with_slots(1).with_slot_size(1, 2),
                Topic::new(2).with_slots(1).with_slot_size(1, 4),
            ],
            vec![
                Application::new(1, 1, 1, 1).with_size(2),
                Application::new(2, 1, 1, 2).with_size(2),
                Application::new(3, 2, 1, 2).with_size(2),
            ],
        );
        let outcome = TrialRunner::new(&snap)
            .run(&mut Scripted(vec![2, 1]), 0)
            .unwrap();

        // Topic 2 takes group 1 and group 2; topic 1 has nobody left.
        assert_eq!(outcome.state.slots_for(2)[0].occupied_size(), 4);
        assert!(outcome.state.slots_for(1).is_empty());
        assert_eq!(outcome.placements, 2);
    }

    #[test]
    fn test_topics_without_capacity_are_skipped() {
        let snap = snapshot(
            vec![
                Topic::new(1).with_slots(0).with_slot_size(1, 5),
                Topic::new(2).with_slots(2).with_slot_size(0, 0),
            ],
            vec![
                Application::new(1, 1, 1, 1),
                Application::new(2, 2, 1, 2),
            ],
        );
        let outcome = TrialRunner::new(&snap)
            .run(&mut RotationStrategy::from_seed(3), 0)
            .unwrap();
        assert_eq!(outcome.placements, 0);
        assert_eq!(outcome.score, 2 * UNASSIGNED_PENALTY);
    }

    #[test]
    fn test_unknown_topic_in_order_fails() {
        let snap = snapshot(vec![Topic::new(1)], Vec::new());
        let err = TrialRunner::new(&snap)
            .run(&mut Scripted(vec![1, 99]), 0)
            .unwrap_err();
        assert_eq!(err, TrialError::UnknownTopic(99));
    }

    #[test]
    fn test_random_trials_keep_invariants() {
        let topics: Vec<Topic> = (1..=6)
            .map(|id| Topic::new(id).with_slots(2).with_slot_size(2, 5))
            .collect();
        let mut apps = Vec::new();
        let mut next_id = 1;
        for group in 1..=20u64 {
            for (rank, topic) in [group % 6 + 1, (group + 2) % 6 + 1, (group + 4) % 6 + 1]
                .into_iter()
                .enumerate()
            {
                apps.push(
                    Application::new(next_id, group, 1, topic)
                        .with_size((group % 3 + 1) as u32)
                        .with_priority(rank as u32 + 1),
                );
                next_id += 1;
            }
        }
        let snap = snapshot(topics.clone(), apps);

        for trial in 0..25 {
            let mut strategy = RotationStrategy::from_seed(1000 + trial as u64);
            let outcome = TrialRunner::new(&snap).run(&mut strategy, trial).unwrap();
            assert!(validate_trial(&outcome.state, &topics).is_ok());

            let mut per_collection: HashMap<CollectionKey, usize> = HashMap::new();
            for app in outcome.state.accepted() {
                *per_collection.entry(app.collection_key()).or_default() += 1;
            }
            assert!(per_collection.values().all(|&n| n == 1));
            assert_eq!(outcome.score, outcome.state.score());
        }
    }
}
