//! Consistency checks for placement input and trial results.
//!
//! Input checks (before a run):
//! - Duplicate topic or application IDs
//! - Applications referencing unknown topics
//! - Priorities outside `1..=MAX_PRIORITY`
//! - Empty groups
//!
//! Trial checks (after every trial):
//! - Slot capacity (`occupied <= max_slot_size`) for optimizer-owned slots
//! - Slot ids inside `1..=slot_count` for optimizer-owned slots
//! - Collection exclusivity across the whole state
//! - An application placed at most once, and never still open
//!
//! Underfilled slots (`0 < occupied < min_slot_size`) are reported by
//! [`underfilled_slots`] as diagnostics; they do not fail a trial.

use std::collections::{HashMap, HashSet};

use crate::models::{Application, ApplicationId, CollectionKey, Topic, TopicId};
use crate::trial::TrialState;

/// Highest accepted priority value.
pub const MAX_PRIORITY: u32 = 99;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// An application or slot references a topic that doesn't exist.
    UnknownTopic,
    /// Priority outside `1..=MAX_PRIORITY`.
    InvalidPriority,
    /// A group with no students.
    EmptyGroup,
    /// A slot holds more students than `max_slot_size`.
    CapacityExceeded,
    /// A slot id outside `1..=slot_count`.
    SlotOutOfRange,
    /// Two accepted applications share a collection.
    CollectionConflict,
    /// An application is placed twice, or placed and still open.
    DuplicatePlacement,
    /// A non-empty slot below `min_slot_size`.
    Underfilled,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates topics and applications read for a run.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(topics: &[Topic], applications: &[Application]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut topic_ids = HashSet::new();
    for t in topics {
        if !topic_ids.insert(t.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate topic ID: {}", t.id),
            ));
        }
    }

    let mut application_ids = HashSet::new();
    for app in applications {
        if !application_ids.insert(app.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate application ID: {}", app.id),
            ));
        }
        if !topic_ids.contains(&app.topic_id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTopic,
                format!(
                    "Application {} references unknown topic {}",
                    app.id, app.topic_id
                ),
            ));
        }
        if !(1..=MAX_PRIORITY).contains(&app.priority) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidPriority,
                format!(
                    "Application {} has priority {} outside 1..={MAX_PRIORITY}",
                    app.id, app.priority
                ),
            ));
        }
        if app.size == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyGroup,
                format!("Application {} is for an empty group", app.id),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates the invariants of a finished trial.
///
/// Locked slots come from persisted data and are only checked for
/// exclusivity and duplicates, not for capacity or slot range.
pub fn validate_trial(state: &TrialState, topics: &[Topic]) -> ValidationResult {
    let mut errors = Vec::new();
    let by_id: HashMap<TopicId, &Topic> = topics.iter().map(|t| (t.id, t)).collect();

    let mut placed: HashSet<ApplicationId> = HashSet::new();
    let mut owners: HashMap<CollectionKey, ApplicationId> = HashMap::new();

    for (topic_id, slot) in state.slots() {
        let Some(topic) = by_id.get(&topic_id) else {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTopic,
                format!("Slot {} references unknown topic {topic_id}", slot.slot_id),
            ));
            continue;
        };

        if !slot.locked {
            if slot.occupied_size() > topic.max_slot_size {
                errors.push(ValidationError::new(
                    ValidationErrorKind::CapacityExceeded,
                    format!(
                        "Topic {topic_id} slot {} holds {} of {} students",
                        slot.slot_id,
                        slot.occupied_size(),
                        topic.max_slot_size
                    ),
                ));
            }
            if slot.slot_id == 0 || slot.slot_id > topic.slot_count {
                errors.push(ValidationError::new(
                    ValidationErrorKind::SlotOutOfRange,
                    format!(
                        "Topic {topic_id} slot {} outside 1..={}",
                        slot.slot_id, topic.slot_count
                    ),
                ));
            }
        }

        for app in &slot.applications {
            if !placed.insert(app.id) || state.open().contains(app) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicatePlacement,
                    format!("Application {} is placed more than once", app.id),
                ));
            }
            if let Some(other) = owners.insert(app.collection_key(), app.id) {
                if other != app.id {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::CollectionConflict,
                        format!(
                            "Applications {other} and {} both accepted for {}",
                            app.id,
                            app.collection_key()
                        ),
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Non-empty slots holding fewer students than `min_slot_size`.
pub fn underfilled_slots(state: &TrialState, topics: &[Topic]) -> Vec<ValidationError> {
    let by_id: HashMap<TopicId, &Topic> = topics.iter().map(|t| (t.id, t)).collect();
    state
        .slots()
        .filter_map(|(topic_id, slot)| {
            let topic = by_id.get(&topic_id)?;
            let occupied = slot.occupied_size();
            (occupied > 0 && occupied < topic.min_slot_size).then(|| {
                ValidationError::new(
                    ValidationErrorKind::Underfilled,
                    format!(
                        "Topic {topic_id} slot {} has {occupied} of at least {} students",
                        slot.slot_id, topic.min_slot_size
                    ),
                )
            })
        })
        .collect()
}
