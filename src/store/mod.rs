//! Persistence boundary.
//!
//! The optimizer never talks to a database directly. It reads one
//! snapshot of the active term and writes one finalized result through
//! an [`AssignmentStore`]. [`InMemoryStore`] is the reference
//! implementation used by tests and embedding applications.

mod memory;

pub use memory::InMemoryStore;

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::models::{Application, ApplicationId, AssignmentRecord, SlotId, Term, Topic, TopicId};

/// What an upsert did to the stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// The record did not exist before.
    pub created: bool,
    /// Links added by this call.
    pub linked: usize,
}

/// Totals of one [`TrialState::persist`](crate::trial::TrialState::persist) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReport {
    /// Non-empty slots written.
    pub slots: usize,
    /// Records that had to be created.
    pub created: usize,
    /// Application links added.
    pub linked: usize,
}

/// Read/write access to terms, topics, applications, and assignments.
///
/// All reads are scoped to the active term. Implementations must be
/// safe to share between threads.
pub trait AssignmentStore: Send + Sync {
    /// The active term, or [`StoreError::NoActiveTerm`](crate::error::StoreError::NoActiveTerm).
    fn active_term(&self) -> StoreResult<Term>;

    /// Topics of the active term.
    fn read_active_term_topics(&self) -> StoreResult<Vec<Topic>>;

    /// All applications for topics of the active term.
    fn read_applications(&self) -> StoreResult<Vec<Application>>;

    /// All persisted assignment records of the active term.
    fn read_assignments(&self) -> StoreResult<Vec<AssignmentRecord>>;

    /// Gets or creates the `(topic, slot)` record and links the given
    /// applications to it.
    ///
    /// Links that already exist are skipped, so repeating a call is a
    /// no-op. Linking an application that belongs to another record is a
    /// [`StoreError::Conflict`](crate::error::StoreError::Conflict).
    fn upsert_assignment(
        &self,
        topic_id: TopicId,
        slot_id: SlotId,
        application_ids: &[ApplicationId],
    ) -> StoreResult<UpsertOutcome>;

    /// Drops every unlocked link from unlocked records and deletes
    /// records left empty. Links to locked applications stay. Returns the
    /// number of released links.
    fn release_unlocked(&self) -> StoreResult<usize>;
}
