//! Persisted assignment records.
//!
//! These are the rows an [`AssignmentStore`](crate::store::AssignmentStore)
//! keeps: one record per `(topic, slot)` with links back to the accepted
//! applications.

use serde::{Deserialize, Serialize};

use super::{ApplicationId, SlotId, TopicId};

/// A link from an assignment record to an accepted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedApplication {
    /// Linked application.
    pub application_id: ApplicationId,
    /// Finalized individually (survives an overriding run).
    pub locked: bool,
}

impl AcceptedApplication {
    /// Creates an unlocked link.
    pub fn new(application_id: ApplicationId) -> Self {
        Self {
            application_id,
            locked: false,
        }
    }

    /// Creates a locked link.
    pub fn locked(application_id: ApplicationId) -> Self {
        Self {
            application_id,
            locked: true,
        }
    }
}

/// A persisted slot assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Topic of the slot.
    pub topic_id: TopicId,
    /// Slot number within the topic.
    pub slot_id: SlotId,
    /// Finalized as a whole.
    pub locked: bool,
    /// Accepted applications.
    pub accepted: Vec<AcceptedApplication>,
}

impl AssignmentRecord {
    /// Creates an empty, unlocked record.
    pub fn new(topic_id: TopicId, slot_id: SlotId) -> Self {
        Self {
            topic_id,
            slot_id,
            locked: false,
            accepted: Vec::new(),
        }
    }

    /// Sets the slot-level lock.
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Adds an accepted application link.
    pub fn with_accepted(mut self, accepted: AcceptedApplication) -> Self {
        self.accepted.push(accepted);
        self
    }

    /// Whether the application is linked to this record.
    pub fn links(&self, application_id: ApplicationId) -> bool {
        self.accepted
            .iter()
            .any(|a| a.application_id == application_id)
    }

    /// Linked application ids in link order.
    pub fn application_ids(&self) -> Vec<ApplicationId> {
        self.accepted.iter().map(|a| a.application_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let r = AssignmentRecord::new(3, 1)
            .with_locked(true)
            .with_accepted(AcceptedApplication::new(10))
            .with_accepted(AcceptedApplication::locked(11));

        assert!(r.locked);
        assert!(r.links(10));
        assert!(!r.links(12));
        assert_eq!(r.application_ids(), vec![10, 11]);
        assert!(r.accepted[1].locked);
    }
}
