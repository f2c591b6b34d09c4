//! Slot (in-progress assignment) model.
//!
//! A slot is one capacity-bounded bucket of a topic. The optimizer fills
//! slots by appending accepted applications; a locked slot is never
//! touched again.

use serde::{Deserialize, Serialize};

use super::{Application, ApplicationId, SlotId};

/// One slot of a topic with its accepted applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot number within the topic (1-based).
    pub slot_id: SlotId,
    /// Accepted applications in acceptance order.
    pub applications: Vec<Application>,
    /// Locked slots accept no further applications.
    pub locked: bool,
}

impl Slot {
    /// Creates an empty, unlocked slot.
    pub fn new(slot_id: SlotId) -> Self {
        Self {
            slot_id,
            applications: Vec::new(),
            locked: false,
        }
    }

    /// Creates a locked slot holding the given applications.
    pub fn locked(slot_id: SlotId, applications: Vec<Application>) -> Self {
        Self {
            slot_id,
            applications,
            locked: true,
        }
    }

    /// Adds an accepted application.
    pub fn with_application(mut self, application: Application) -> Self {
        self.applications.push(application);
        self
    }

    /// Students currently in this slot.
    pub fn occupied_size(&self) -> u32 {
        self.applications.iter().map(|a| a.size).sum()
    }

    /// Seats left under `max_slot_size` (saturating).
    #[inline]
    pub fn remaining(&self, max_slot_size: u32) -> u32 {
        max_slot_size.saturating_sub(self.occupied_size())
    }

    /// Sum of the accepted applications' scores.
    pub fn score(&self) -> i64 {
        crate::scoring::assigned_score(&self.applications)
    }

    /// Whether no application has been accepted.
    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    /// Whether the given application is in this slot.
    pub fn contains(&self, application_id: ApplicationId) -> bool {
        self.applications.iter().any(|a| a.id == application_id)
    }
}
