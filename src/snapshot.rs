//! Immutable starting state shared by all trials.
//!
//! The loader reads the active term once and splits it into:
//! - fixed slots (persisted assignments the optimizer must keep), and
//! - the open pool (applications still eligible for placement).
//!
//! # Override semantics
//!
//! | `override_assignments` | Fixed | Open |
//! |---|---|---|
//! | `false` | every persisted slot, locked as a whole | unassigned applications |
//! | `true` | locked slots, plus locked links and locked applications of unlocked slots | everything else |
//!
//! Collections with a fixed acceptance are already satisfied and never
//! enter the open pool.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::error::{OptimizerError, OptimizerResult, StoreResult};
use crate::models::{
    Application, ApplicationId, AssignmentRecord, CollectionKey, OpenPool, Slot, Term, Topic,
    TopicId,
};
use crate::scoring;
use crate::store::AssignmentStore;
use crate::validation::validate_input;

/// Read-only starting state of an optimization run.
#[derive(Debug, Clone)]
pub struct Snapshot {
    term: Term,
    override_assignments: bool,
    topics: Vec<Topic>,
    topic_index: HashMap<TopicId, usize>,
    fixed_slots: BTreeMap<TopicId, Vec<Slot>>,
    open: OpenPool,
    database_score: i64,
}

impl Snapshot {
    /// Assembles a snapshot from already resolved parts.
    ///
    /// Slots are sorted by slot id per topic. The stored score defaults to
    /// the score of the fixed slots with every open collection unplaced.
    pub fn new(
        term: Term,
        override_assignments: bool,
        topics: Vec<Topic>,
        mut fixed_slots: BTreeMap<TopicId, Vec<Slot>>,
        open: OpenPool,
    ) -> Self {
        let topic_index = topics.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        for slots in fixed_slots.values_mut() {
            slots.sort_by_key(|s| s.slot_id);
        }
        let fixed_apps = fixed_slots
            .values()
            .flatten()
            .flat_map(|s| s.applications.iter());
        let database_score = scoring::assigned_score(fixed_apps)
            + scoring::unassigned_penalty(open.collection_count());
        Self {
            term,
            override_assignments,
            topics,
            topic_index,
            fixed_slots,
            open,
            database_score,
        }
    }

    /// Sets the score of the assignment currently persisted.
    pub fn with_database_score(mut self, score: i64) -> Self {
        self.database_score = score;
        self
    }

    /// The term this snapshot was read from.
    pub fn term(&self) -> &Term {
        &self.term
    }

    /// Whether unlocked assignments were released into the open pool.
    pub fn override_assignments(&self) -> bool {
        self.override_assignments
    }

    /// Topics of the active term.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Looks up a topic.
    pub fn topic(&self, topic_id: TopicId) -> Option<&Topic> {
        self.topic_index.get(&topic_id).map(|&i| &self.topics[i])
    }

    /// Fixed slots per topic.
    pub fn fixed_slots(&self) -> &BTreeMap<TopicId, Vec<Slot>> {
        &self.fixed_slots
    }

    /// Applications eligible for placement.
    pub fn open(&self) -> &OpenPool {
        &self.open
    }

    /// Applications already fixed in a slot.
    pub fn fixed_applications(&self) -> impl Iterator<Item = &Application> {
        self.fixed_slots
            .values()
            .flatten()
            .flat_map(|s| s.applications.iter())
    }

    /// Whether any open or fixed application targets the topic.
    pub fn has_applications(&self, topic_id: TopicId) -> bool {
        !self.open.for_topic(topic_id).is_empty()
            || self
                .fixed_slots
                .get(&topic_id)
                .is_some_and(|slots| slots.iter().any(|s| !s.is_empty()))
    }

    /// Best score any trial could reach from this snapshot.
    pub fn max_score(&self) -> i64 {
        scoring::max_score(self.fixed_applications(), self.open.iter())
    }

    /// Score of the assignment persisted when the snapshot was read.
    ///
    /// A run only writes a result that beats it.
    pub fn database_score(&self) -> i64 {
        self.database_score
    }
}

/// Builds a [`Snapshot`] from an [`AssignmentStore`].
///
/// # Example
/// ```
/// use u_assign::models::{Application, Term, Topic};
/// use u_assign::snapshot::SnapshotLoader;
/// use u_assign::store::InMemoryStore;
///
/// let store = InMemoryStore::new()
///     .with_term(Term::new(1, "WS 2026"))
///     .with_topic(Topic::new(10).with_slots(1).with_slot_size(1, 5))
///     .with_application(Application::new(1, 1, 1, 10).with_size(3));
///
/// let snapshot = SnapshotLoader::new(&store).load(false).unwrap();
/// assert_eq!(snapshot.open().len(), 1);
/// assert!(snapshot.has_applications(10));
/// ```
#[derive(Debug)]
pub struct SnapshotLoader<'s, S: AssignmentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: AssignmentStore + ?Sized> SnapshotLoader<'s, S> {
    /// Creates a loader over the given store.
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Topics of the active term.
    pub fn read_active_term_topics(&self) -> StoreResult<Vec<Topic>> {
        self.store.read_active_term_topics()
    }

    /// Fixed slots per topic.
    pub fn read_locked_assignments(
        &self,
        override_assignments: bool,
    ) -> StoreResult<BTreeMap<TopicId, Vec<Slot>>> {
        let topics = self.read_active_term_topics()?;
        let applications = index_applications(self.store.read_applications()?);
        let records = self.store.read_assignments()?;
        Ok(fixed_slots(
            &records,
            &applications,
            &topic_ids(&topics),
            override_assignments,
        ))
    }

    /// Applications still eligible for placement.
    pub fn read_open_applications(&self, override_assignments: bool) -> StoreResult<OpenPool> {
        let topics = self.read_active_term_topics()?;
        let ids = topic_ids(&topics);
        let applications = index_applications(self.store.read_applications()?);
        let records = self.store.read_assignments()?;
        let fixed = fixed_slots(&records, &applications, &ids, override_assignments);
        Ok(open_pool(&applications, &fixed, &ids))
    }

    /// Reads the store once and builds the snapshot.
    ///
    /// # Errors
    /// - [`OptimizerError::SnapshotUnavailable`] if the active term or any
    ///   of its data cannot be read.
    /// - [`OptimizerError::InvalidSnapshot`] if the rows fail validation.
    pub fn load(&self, override_assignments: bool) -> OptimizerResult<Snapshot> {
        let term = self
            .store
            .active_term()
            .map_err(OptimizerError::SnapshotUnavailable)?;
        let topics = self
            .read_active_term_topics()
            .map_err(OptimizerError::SnapshotUnavailable)?;
        let ids = topic_ids(&topics);

        let raw = self
            .store
            .read_applications()
            .map_err(OptimizerError::SnapshotUnavailable)?;
        let (known, unknown): (Vec<_>, Vec<_>) =
            raw.into_iter().partition(|a| ids.contains(&a.topic_id));
        for app in &unknown {
            warn!(
                application_id = app.id,
                topic_id = app.topic_id,
                "dropping application for a topic outside the active term"
            );
        }
        validate_input(&topics, &known).map_err(OptimizerError::InvalidSnapshot)?;

        let records = self
            .store
            .read_assignments()
            .map_err(OptimizerError::SnapshotUnavailable)?;
        let applications = index_applications(known);
        let fixed = fixed_slots(&records, &applications, &ids, override_assignments);
        let open = open_pool(&applications, &fixed, &ids);
        let database_score = scoring::database_score(
            &linked_applications(&records, &applications, &ids),
            applications.values(),
        );

        debug!(
            term = %term.name,
            topics = topics.len(),
            fixed_slots = fixed.values().map(Vec::len).sum::<usize>(),
            open_applications = open.len(),
            open_collections = open.collection_count(),
            database_score,
            "snapshot loaded"
        );
        Ok(Snapshot::new(term, override_assignments, topics, fixed, open)
            .with_database_score(database_score))
    }
}

fn topic_ids(topics: &[Topic]) -> BTreeSet<TopicId> {
    topics.iter().map(|t| t.id).collect()
}

fn index_applications(applications: Vec<Application>) -> BTreeMap<ApplicationId, Application> {
    applications.into_iter().map(|a| (a.id, a)).collect()
}

/// Every application currently linked by a record of the term.
fn linked_applications(
    records: &[AssignmentRecord],
    applications: &BTreeMap<ApplicationId, Application>,
    topics: &BTreeSet<TopicId>,
) -> Vec<Application> {
    records
        .iter()
        .filter(|r| topics.contains(&r.topic_id))
        .flat_map(|r| r.accepted.iter())
        .filter_map(|link| applications.get(&link.application_id).copied())
        .collect()
}

/// Resolves persisted records into the slots that stay fixed.
fn fixed_slots(
    records: &[AssignmentRecord],
    applications: &BTreeMap<ApplicationId, Application>,
    topics: &BTreeSet<TopicId>,
    override_assignments: bool,
) -> BTreeMap<TopicId, Vec<Slot>> {
    let mut fixed: BTreeMap<TopicId, Vec<Slot>> = BTreeMap::new();

    for record in records {
        if !topics.contains(&record.topic_id) {
            continue;
        }
        let keep_all = record.locked || !override_assignments;
        let kept: Vec<Application> = record
            .accepted
            .iter()
            .filter_map(|link| match applications.get(&link.application_id) {
                Some(app) if keep_all || link.locked || app.locked => Some(app.with_locked(true)),
                Some(_) => None,
                None => {
                    warn!(
                        application_id = link.application_id,
                        topic_id = record.topic_id,
                        slot_id = record.slot_id,
                        "assignment links an unknown application"
                    );
                    None
                }
            })
            .collect();

        let slot = if keep_all {
            if kept.is_empty() && !record.locked {
                continue;
            }
            Slot::locked(record.slot_id, kept)
        } else {
            if kept.is_empty() {
                continue;
            }
            Slot {
                slot_id: record.slot_id,
                applications: kept,
                locked: false,
            }
        };
        fixed.entry(record.topic_id).or_default().push(slot);
    }
    fixed
}

/// Everything not fixed and not in an already satisfied collection.
fn open_pool(
    applications: &BTreeMap<ApplicationId, Application>,
    fixed: &BTreeMap<TopicId, Vec<Slot>>,
    topics: &BTreeSet<TopicId>,
) -> OpenPool {
    let fixed_apps = fixed.values().flatten().flat_map(|s| s.applications.iter());
    let mut placed: BTreeSet<ApplicationId> = BTreeSet::new();
    let mut satisfied: BTreeSet<CollectionKey> = BTreeSet::new();
    for app in fixed_apps {
        placed.insert(app.id);
        satisfied.insert(app.collection_key());
    }

    applications
        .values()
        .filter(|a| topics.contains(&a.topic_id))
        .filter(|a| !a.locked)
        .filter(|a| !placed.contains(&a.id))
        .filter(|a| !satisfied.contains(&a.collection_key()))
        .copied()
        .collect()
}
