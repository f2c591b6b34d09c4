//! Topic and term models.

use serde::{Deserialize, Serialize};

use super::{SlotId, TermId, TopicId};

/// A term (semester). Only the active term is optimized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Unique term identifier.
    pub id: TermId,
    /// Display name (e.g., "WS 2026").
    pub name: String,
    /// Finalized terms may not be re-assigned.
    pub finalized: bool,
}

impl Term {
    /// Creates an open (not finalized) term.
    pub fn new(id: TermId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            finalized: false,
        }
    }

    /// Marks the term as finalized.
    pub fn finalized(mut self) -> Self {
        self.finalized = true;
        self
    }
}

/// A topic offering a number of equally sized slots.
///
/// A topic with `slot_count == 0` or `max_slot_size == 0` offers no
/// capacity and is never filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Unique topic identifier.
    pub id: TopicId,
    /// Human-readable title.
    pub title: String,
    /// Number of slots.
    pub slot_count: u32,
    /// Minimum students in a non-empty slot.
    pub min_slot_size: u32,
    /// Maximum students in a slot.
    pub max_slot_size: u32,
}

impl Topic {
    /// Creates a topic with one slot of size 1.
    pub fn new(id: TopicId) -> Self {
        Self {
            id,
            title: String::new(),
            slot_count: 1,
            min_slot_size: 1,
            max_slot_size: 1,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the number of slots.
    pub fn with_slots(mut self, slot_count: u32) -> Self {
        self.slot_count = slot_count;
        self
    }

    /// Sets the slot size bounds.
    pub fn with_slot_size(mut self, min: u32, max: u32) -> Self {
        self.min_slot_size = min;
        self.max_slot_size = max;
        self
    }

    /// Whether this topic can hold any student at all.
    #[inline]
    pub fn has_capacity(&self) -> bool {
        self.slot_count > 0 && self.max_slot_size > 0
    }

    /// Valid slot ids (`1..=slot_count`).
    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> {
        1..=self.slot_count
    }

    /// Total seats across all slots.
    pub fn total_capacity(&self) -> u64 {
        u64::from(self.slot_count) * u64::from(self.max_slot_size)
    }
}
