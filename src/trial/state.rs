//! Working state of one trial.
//!
//! A `TrialState` owns its slots and its open pool outright; cloning a
//! snapshot into one never shares mutable data with another trial.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{StoreResult, TrialError, TrialResult};
use crate::models::{Application, OpenPool, Slot, SlotId, Topic, TopicId};
use crate::scoring;
use crate::snapshot::Snapshot;
use crate::store::{AssignmentStore, PersistReport};

/// The slot a topic should fill next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenSlot {
    /// Seats available in the slot.
    pub capacity: u32,
    /// Slot to place into.
    pub slot_id: SlotId,
}

impl OpenSlot {
    /// Returned when a topic has no room left.
    pub const FULL: OpenSlot = OpenSlot {
        capacity: 0,
        slot_id: 1,
    };

    /// Whether the topic is exhausted.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.capacity == 0
    }
}

/// Slots and open applications of one trial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialState {
    slots: BTreeMap<TopicId, Vec<Slot>>,
    open: OpenPool,
}

impl TrialState {
    /// Creates a state from slots and an open pool.
    pub fn new(mut slots: BTreeMap<TopicId, Vec<Slot>>, open: OpenPool) -> Self {
        for list in slots.values_mut() {
            list.sort_by_key(|s| s.slot_id);
        }
        Self { slots, open }
    }

    /// Fresh copy of a snapshot's fixed slots and open pool.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            slots: snapshot.fixed_slots().clone(),
            open: snapshot.open().clone(),
        }
    }

    /// Slots of a topic, ordered by slot id.
    pub fn slots_for(&self, topic_id: TopicId) -> &[Slot] {
        self.slots.get(&topic_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All `(topic, slot)` pairs.
    pub fn slots(&self) -> impl Iterator<Item = (TopicId, &Slot)> {
        self.slots
            .iter()
            .flat_map(|(&topic_id, list)| list.iter().map(move |s| (topic_id, s)))
    }

    /// Applications still open in this trial.
    pub fn open(&self) -> &OpenPool {
        &self.open
    }

    /// All accepted applications.
    pub fn accepted(&self) -> impl Iterator<Item = &Application> {
        self.slots().flat_map(|(_, s)| s.applications.iter())
    }

    /// Number of accepted applications.
    pub fn accepted_count(&self) -> usize {
        self.accepted().count()
    }

    /// Finds the slot a topic should fill next.
    ///
    /// While the topic has fewer slots than `slot_count`, a brand-new slot
    /// at full `max_slot_size` is preferred (lowest unused id). Otherwise
    /// the unlocked slot with the most spare seats wins, lowest id on ties.
    /// Returns [`OpenSlot::FULL`] when nothing has room.
    ///
    /// # Example
    /// ```
    /// use u_assign::models::Topic;
    /// use u_assign::trial::{OpenSlot, TrialState};
    ///
    /// let topic = Topic::new(1).with_slots(2).with_slot_size(1, 5);
    /// let state = TrialState::default();
    /// assert_eq!(state.biggest_open_slot(&topic), OpenSlot { capacity: 5, slot_id: 1 });
    /// ```
    pub fn biggest_open_slot(&self, topic: &Topic) -> OpenSlot {
        if !topic.has_capacity() {
            return OpenSlot::FULL;
        }
        let slots = self.slots_for(topic.id);

        if slots.len() < topic.slot_count as usize {
            let unused = topic
                .slot_ids()
                .find(|id| !slots.iter().any(|s| s.slot_id == *id));
            if let Some(slot_id) = unused {
                return OpenSlot {
                    capacity: topic.max_slot_size,
                    slot_id,
                };
            }
        }

        let mut best = OpenSlot::FULL;
        for slot in slots.iter().filter(|s| !s.locked) {
            let capacity = slot.remaining(topic.max_slot_size);
            if capacity > best.capacity {
                best = OpenSlot {
                    capacity,
                    slot_id: slot.slot_id,
                };
            }
        }
        best
    }

    /// Removes the application and its collection siblings from the open
    /// pool. Returns everything removed.
    ///
    /// # Errors
    /// [`TrialError::NotOpen`] if the application is not open.
    pub fn accept(&mut self, application: &Application) -> TrialResult<Vec<Application>> {
        self.open
            .accept(application)
            .ok_or(TrialError::NotOpen(application.id))
    }

    /// Appends the application to a slot of its topic, creating the slot
    /// if needed.
    ///
    /// Capacity is not checked here; callers pick candidates that fit
    /// [`biggest_open_slot`](Self::biggest_open_slot).
    ///
    /// # Errors
    /// [`TrialError::SlotLocked`] if the slot is locked.
    pub fn add_application(&mut self, application: Application, slot_id: SlotId) -> TrialResult<()> {
        let topic_id = application.topic_id;
        let list = self.slots.entry(topic_id).or_default();
        match list.binary_search_by_key(&slot_id, |s| s.slot_id) {
            Ok(i) => {
                let slot = &mut list[i];
                if slot.locked {
                    return Err(TrialError::SlotLocked { topic_id, slot_id });
                }
                slot.applications.push(application);
            }
            Err(i) => list.insert(i, Slot::new(slot_id).with_application(application)),
        }
        Ok(())
    }

    /// Accepts the application and places it into the slot.
    ///
    /// Nothing changes if either step would fail.
    pub fn place(&mut self, application: Application, slot_id: SlotId) -> TrialResult<()> {
        let topic_id = application.topic_id;
        if self
            .slots_for(topic_id)
            .iter()
            .any(|s| s.slot_id == slot_id && s.locked)
        {
            return Err(TrialError::SlotLocked { topic_id, slot_id });
        }
        self.accept(&application)?;
        self.add_application(application, slot_id)
    }

    /// Points for accepted applications plus the penalty for every
    /// collection still open.
    pub fn score(&self) -> i64 {
        scoring::assigned_score(self.accepted())
            + scoring::unassigned_penalty(self.open.collection_count())
    }

    /// Writes every non-empty slot to the store.
    ///
    /// Uses get-or-create upserts, so persisting the same state twice
    /// leaves the store unchanged the second time.
    pub fn persist<S: AssignmentStore + ?Sized>(&self, store: &S) -> StoreResult<PersistReport> {
        let mut report = PersistReport::default();
        for (topic_id, slot) in self.slots().filter(|(_, s)| !s.is_empty()) {
            let ids: Vec<_> = slot.applications.iter().map(|a| a.id).collect();
            let outcome = store.upsert_assignment(topic_id, slot.slot_id, &ids)?;
            report.slots += 1;
            report.created += usize::from(outcome.created);
            report.linked += outcome.linked;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcceptedApplication, AssignmentRecord, CollectionKey, Term};
    use crate::store::InMemoryStore;

    fn topic() -> Topic {
        Topic::new(10).with_slots(2).with_slot_size(1, 5)
    }

    fn open_pool() -> OpenPool {
        [
            Application::new(1, 1, 1, 10).with_size(3),
            Application::new(2, 2, 1, 10).with_size(2).with_priority(2),
            Application::new(3, 1, 1, 11).with_size(1),
            Application::new(4, 3, 1, 10).with_size(4),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_new_slot_preferred_while_available() {
        let mut state = TrialState::new(BTreeMap::new(), open_pool());
        let t = topic();

        assert_eq!(state.biggest_open_slot(&t), OpenSlot { capacity: 5, slot_id: 1 });
        state.place(Application::new(1, 1, 1, 10).with_size(3), 1).unwrap();
        assert_eq!(state.biggest_open_slot(&t), OpenSlot { capacity: 5, slot_id: 2 });
        state.place(Application::new(4, 3, 1, 10).with_size(4), 2).unwrap();

        // Both slots exist: slot 1 has 2 seats left, slot 2 has 1.
        assert_eq!(state.biggest_open_slot(&t), OpenSlot { capacity: 2, slot_id: 1 });
        state.place(Application::new(2, 2, 1, 10).with_size(2).with_priority(2), 1).unwrap();
        assert_eq!(state.biggest_open_slot(&t), OpenSlot { capacity: 1, slot_id: 2 });
    }

    #[test]
    fn test_unused_slot_id_fills_gap() {
        let mut slots = BTreeMap::new();
        slots.insert(
            10,
            vec![Slot::locked(2, vec![Application::new(9, 9, 1, 10)])],
        );
        let state = TrialState::new(slots, OpenPool::new());
        assert_eq!(
            state.biggest_open_slot(&topic()),
            OpenSlot { capacity: 5, slot_id: 1 }
        );
    }

    #[test]
    fn test_locked_slots_are_never_offered() {
        let mut slots = BTreeMap::new();
        slots.insert(
            10,
            vec![
                Slot::locked(1, vec![Application::new(8, 8, 1, 10)]),
                Slot::locked(2, Vec::new()),
            ],
        );
        let state = TrialState::new(slots, OpenPool::new());
        assert!(state.biggest_open_slot(&topic()).is_full());
    }

    #[test]
    fn test_topic_without_capacity_is_full() {
        let state = TrialState::default();
        assert_eq!(
            state.biggest_open_slot(&Topic::new(1).with_slots(0)),
            OpenSlot::FULL
        );
        assert_eq!(
            state.biggest_open_slot(&Topic::new(1).with_slot_size(0, 0)),
            OpenSlot::FULL
        );
    }

    #[test]
    fn test_accept_removes_collection_everywhere() {
        let mut state = TrialState::new(BTreeMap::new(), open_pool());
        let removed = state.accept(&Application::new(1, 1, 1, 10).with_size(3)).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(state.open().for_topic(11).is_empty());
        assert!(state
            .open()
            .for_collection(&CollectionKey::new(1, 1))
            .is_empty());
        assert_eq!(
            state.accept(&Application::new(3, 1, 1, 11).with_size(1)),
            Err(TrialError::NotOpen(3))
        );
    }

    #[test]
    fn test_place_into_locked_slot_changes_nothing() {
        let mut slots = BTreeMap::new();
        slots.insert(10, vec![Slot::locked(1, Vec::new())]);
        let mut state = TrialState::new(slots, open_pool());
        let before = state.clone();

        let err = state
            .place(Application::new(2, 2, 1, 10).with_size(2).with_priority(2), 1)
            .unwrap_err();
        assert_eq!(err, TrialError::SlotLocked { topic_id: 10, slot_id: 1 });
        assert_eq!(state, before);
    }

    #[test]
    fn test_score_counts_open_collections() {
        let mut state = TrialState::new(BTreeMap::new(), open_pool());
        // 3 open collections.
        assert_eq!(state.score(), 3 * scoring::UNASSIGNED_PENALTY);

        state.place(Application::new(1, 1, 1, 10).with_size(3), 1).unwrap();
        state.place(Application::new(2, 2, 1, 10).with_size(2).with_priority(2), 1).unwrap();
        assert_eq!(state.score(), 20 + 19 + scoring::UNASSIGNED_PENALTY);
        assert_eq!(state.accepted_count(), 2);
    }

    #[test]
    fn test_clones_are_isolated() {
        let base = TrialState::new(BTreeMap::new(), open_pool());
        let mut a = base.clone();
        a.place(Application::new(1, 1, 1, 10).with_size(3), 1).unwrap();

        assert_eq!(base.accepted_count(), 0);
        assert_eq!(base.open().len(), 4);
        assert_eq!(a.open().len(), 2);
    }

    #[test]
    fn test_persist_is_idempotent() {
        let store = InMemoryStore::new()
            .with_term(Term::new(1, "WS 2026"))
            .with_topic(topic())
            .with_topic(Topic::new(11))
            .with_application(Application::new(1, 1, 1, 10).with_size(3))
            .with_application(Application::new(2, 2, 1, 10).with_size(2))
            .with_application(Application::new(3, 1, 1, 11))
            .with_application(Application::new(4, 3, 1, 10).with_size(4))
            .with_assignment(
                AssignmentRecord::new(10, 2)
                    .with_locked(true)
                    .with_accepted(AcceptedApplication::new(4)),
            );

        let mut slots = BTreeMap::new();
        slots.insert(
            10,
            vec![Slot::locked(2, vec![Application::new(4, 3, 1, 10).with_size(4)])],
        );
        let mut state = TrialState::new(slots, open_pool());
        state.place(Application::new(1, 1, 1, 10).with_size(3), 1).unwrap();
        state.place(Application::new(2, 2, 1, 10).with_size(2), 1).unwrap();

        let first = state.persist(&store).unwrap();
        assert_eq!(first, PersistReport { slots: 2, created: 1, linked: 2 });

        let second = state.persist(&store).unwrap();
        assert_eq!(second, PersistReport { slots: 2, created: 0, linked: 0 });

        assert_eq!(store.link_count(), 3);
        assert_eq!(store.assignment(10, 1).unwrap().application_ids(), vec![1, 2]);
    }
}
