//! Application model.
//!
//! An application is one group's ranked request for one topic. A group
//! files its applications in numbered collections; within one
//! `(group, collection)` at most one application may be accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ApplicationId, CollectionId, GroupId, TopicId};

/// Key of a set of mutually exclusive applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionKey {
    /// Applying group.
    pub group_id: GroupId,
    /// Collection number within the group.
    pub collection_id: CollectionId,
}

impl CollectionKey {
    /// Creates a collection key.
    pub fn new(group_id: GroupId, collection_id: CollectionId) -> Self {
        Self {
            group_id,
            collection_id,
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}/collection {}", self.group_id, self.collection_id)
    }
}

/// A group's application for a topic.
///
/// `size` is the group's student count, copied here so placement never
/// has to look the group up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Application {
    /// Unique application identifier.
    pub id: ApplicationId,
    /// Applying group.
    pub group_id: GroupId,
    /// Collection the application belongs to.
    pub collection_id: CollectionId,
    /// Requested topic.
    pub topic_id: TopicId,
    /// Number of students in the group.
    pub size: u32,
    /// Preference rank (1 = most preferred).
    pub priority: u32,
    /// Fixed by an earlier, finalized decision.
    pub locked: bool,
}

impl Application {
    /// Creates an unlocked application of size 1 and priority 1.
    pub fn new(
        id: ApplicationId,
        group_id: GroupId,
        collection_id: CollectionId,
        topic_id: TopicId,
    ) -> Self {
        Self {
            id,
            group_id,
            collection_id,
            topic_id,
            size: 1,
            priority: 1,
            locked: false,
        }
    }

    /// Sets the group size.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the lock flag.
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// The `(group, collection)` this application competes in.
    #[inline]
    pub fn collection_key(&self) -> CollectionKey {
        CollectionKey::new(self.group_id, self.collection_id)
    }

    /// Points this application earns when accepted.
    #[inline]
    pub fn score(&self) -> i64 {
        crate::scoring::score_for_assigned(self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_builder() {
        let app = Application::new(10, 5, 1, 3)
            .with_size(4)
            .with_priority(2)
            .with_locked(true);

        assert_eq!(app.id, 10);
        assert_eq!(app.topic_id, 3);
        assert_eq!(app.size, 4);
        assert_eq!(app.priority, 2);
        assert!(app.locked);
        assert_eq!(app.score(), 19);
    }

    #[test]
    fn test_collection_key_shared_across_topics() {
        let a = Application::new(1, 5, 1, 10);
        let b = Application::new(2, 5, 1, 11);
        let c = Application::new(3, 5, 2, 10);

        assert_eq!(a.collection_key(), b.collection_key());
        assert_ne!(a.collection_key(), c.collection_key());
        assert_eq!(a.collection_key().to_string(), "group 5/collection 1");
    }
}
