//! Pool of still-open applications.

use serde::{Deserialize, Serialize};

use super::{Application, ApplicationId, CollectionKey, MultiMap, TopicId};

/// Applications not yet accepted, indexed by topic and by collection.
///
/// Both indexes always hold the same applications. Accepting one
/// application removes its whole collection from both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPool {
    by_topic: MultiMap<TopicId, Application>,
    by_collection: MultiMap<CollectionKey, Application>,
}

impl OpenPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an application to both indexes.
    pub fn insert(&mut self, application: Application) {
        self.by_topic.insert(application.topic_id, application);
        self.by_collection
            .insert(application.collection_key(), application);
    }

    /// Open applications for a topic, in load order.
    pub fn for_topic(&self, topic_id: TopicId) -> &[Application] {
        self.by_topic.get(&topic_id)
    }

    /// Open applications of a collection.
    pub fn for_collection(&self, key: &CollectionKey) -> &[Application] {
        self.by_collection.get(key)
    }

    /// Whether the application is still open.
    pub fn contains(&self, application: &Application) -> bool {
        self.for_collection(&application.collection_key())
            .iter()
            .any(|a| a.id == application.id)
    }

    /// Removes the application's whole collection from the pool.
    ///
    /// Returns the removed applications (the accepted one included), or
    /// `None` if the application was not open.
    pub fn accept(&mut self, application: &Application) -> Option<Vec<Application>> {
        if !self.contains(application) {
            return None;
        }
        let siblings = self.by_collection.remove(&application.collection_key())?;
        for sibling in &siblings {
            let id: ApplicationId = sibling.id;
            self.by_topic.retain(&sibling.topic_id, |a| a.id != id);
        }
        Some(siblings)
    }

    /// The topic index.
    pub fn by_topic(&self) -> &MultiMap<TopicId, Application> {
        &self.by_topic
    }

    /// The collection index.
    pub fn by_collection(&self) -> &MultiMap<CollectionKey, Application> {
        &self.by_collection
    }

    /// Distinct open collections.
    pub fn collection_count(&self) -> usize {
        self.by_collection.len()
    }

    /// Number of open applications.
    pub fn len(&self) -> usize {
        self.by_collection.value_count()
    }

    /// Whether nothing is open.
    pub fn is_empty(&self) -> bool {
        self.by_collection.is_empty()
    }

    /// All open applications, grouped by collection.
    pub fn iter(&self) -> impl Iterator<Item = &Application> {
        self.by_collection.values()
    }
}

impl FromIterator<Application> for OpenPool {
    fn from_iter<I: IntoIterator<Item = Application>>(iter: I) -> Self {
        let mut pool = Self::new();
        for application in iter {
            pool.insert(application);
        }
        pool
    }
}
