//! Thread-safe in-memory assignment store.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::{AssignmentStore, UpsertOutcome};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    AcceptedApplication, Application, ApplicationId, AssignmentRecord, SlotId, Term, Topic,
    TopicId,
};

#[derive(Debug, Default)]
struct Inner {
    term: Option<Term>,
    topics: Vec<Topic>,
    applications: BTreeMap<ApplicationId, Application>,
    assignments: BTreeMap<(TopicId, SlotId), AssignmentRecord>,
}

impl Inner {
    fn record_of(&self, application_id: ApplicationId) -> Option<&AssignmentRecord> {
        self.assignments.values().find(|r| r.links(application_id))
    }
}

/// An [`AssignmentStore`] backed by in-process maps.
///
/// Holds a single term; everything stored belongs to it.
///
/// # Example
/// ```
/// use u_assign::models::{Application, Term, Topic};
/// use u_assign::store::{AssignmentStore, InMemoryStore};
///
/// let store = InMemoryStore::new()
///     .with_term(Term::new(1, "WS 2026"))
///     .with_topic(Topic::new(10).with_slots(1).with_slot_size(1, 5))
///     .with_application(Application::new(1, 1, 1, 10).with_size(3));
///
/// let outcome = store.upsert_assignment(10, 1, &[1]).unwrap();
/// assert!(outcome.created);
/// assert_eq!(store.read_assignments().unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Creates an empty store without an active term.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the active term.
    pub fn with_term(self, term: Term) -> Self {
        self.inner.write().term = Some(term);
        self
    }

    /// Adds a topic.
    pub fn with_topic(self, topic: Topic) -> Self {
        self.inner.write().topics.push(topic);
        self
    }

    /// Adds an application.
    pub fn with_application(self, application: Application) -> Self {
        self.inner
            .write()
            .applications
            .insert(application.id, application);
        self
    }

    /// Adds (or replaces) a persisted assignment record.
    pub fn with_assignment(self, record: AssignmentRecord) -> Self {
        self.inner
            .write()
            .assignments
            .insert((record.topic_id, record.slot_id), record);
        self
    }

    /// Marks the active term as finalized.
    pub fn finalize_term(&self) {
        if let Some(term) = self.inner.write().term.as_mut() {
            term.finalized = true;
        }
    }

    /// Snapshot of the record for `(topic, slot)`.
    pub fn assignment(&self, topic_id: TopicId, slot_id: SlotId) -> Option<AssignmentRecord> {
        self.inner
            .read()
            .assignments
            .get(&(topic_id, slot_id))
            .cloned()
    }

    /// The record an application is linked to, if any.
    pub fn assignment_of(&self, application_id: ApplicationId) -> Option<AssignmentRecord> {
        self.inner.read().record_of(application_id).cloned()
    }

    /// Total number of application links.
    pub fn link_count(&self) -> usize {
        self.inner
            .read()
            .assignments
            .values()
            .map(|r| r.accepted.len())
            .sum()
    }
}

impl AssignmentStore for InMemoryStore {
    fn active_term(&self) -> StoreResult<Term> {
        self.inner.read().term.clone().ok_or(StoreError::NoActiveTerm)
    }

    fn read_active_term_topics(&self) -> StoreResult<Vec<Topic>> {
        let inner = self.inner.read();
        if inner.term.is_none() {
            return Err(StoreError::NoActiveTerm);
        }
        Ok(inner.topics.clone())
    }

    fn read_applications(&self) -> StoreResult<Vec<Application>> {
        let inner = self.inner.read();
        if inner.term.is_none() {
            return Err(StoreError::NoActiveTerm);
        }
        Ok(inner.applications.values().copied().collect())
    }

    fn read_assignments(&self) -> StoreResult<Vec<AssignmentRecord>> {
        let inner = self.inner.read();
        if inner.term.is_none() {
            return Err(StoreError::NoActiveTerm);
        }
        Ok(inner.assignments.values().cloned().collect())
    }

    fn upsert_assignment(
        &self,
        topic_id: TopicId,
        slot_id: SlotId,
        application_ids: &[ApplicationId],
    ) -> StoreResult<UpsertOutcome> {
        let mut inner = self.inner.write();

        if !inner.topics.iter().any(|t| t.id == topic_id) {
            return Err(StoreError::NotFound(format!("topic {topic_id}")));
        }

        // Check everything before touching the record.
        let existing = inner.assignments.get(&(topic_id, slot_id));
        let mut new_links = Vec::new();
        for &id in application_ids {
            if !inner.applications.contains_key(&id) {
                return Err(StoreError::NotFound(format!("application {id}")));
            }
            if existing.is_some_and(|r| r.links(id)) || new_links.contains(&id) {
                continue;
            }
            if let Some(other) = inner.record_of(id) {
                return Err(StoreError::Conflict {
                    application_id: id,
                    topic_id: other.topic_id,
                    slot_id: other.slot_id,
                });
            }
            new_links.push(id);
        }
        if existing.is_some_and(|r| r.locked) && !new_links.is_empty() {
            return Err(StoreError::LockedSlot { topic_id, slot_id });
        }

        let created = existing.is_none();
        let record = inner
            .assignments
            .entry((topic_id, slot_id))
            .or_insert_with(|| AssignmentRecord::new(topic_id, slot_id));
        record
            .accepted
            .extend(new_links.iter().copied().map(AcceptedApplication::new));

        Ok(UpsertOutcome {
            created,
            linked: new_links.len(),
        })
    }

    fn release_unlocked(&self) -> StoreResult<usize> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let mut released = 0;
        for record in inner.assignments.values_mut().filter(|r| !r.locked) {
            let before = record.accepted.len();
            record.accepted.retain(|link| {
                link.locked
                    || inner
                        .applications
                        .get(&link.application_id)
                        .is_some_and(|app| app.locked)
            });
            released += before - record.accepted.len();
        }
        inner
            .assignments
            .retain(|_, r| r.locked || !r.accepted.is_empty());
        Ok(released)
    }
}
