//! Randomized decisions that make trials differ.
//!
//! A [`PlacementStrategy`] decides the order in which a trial visits
//! topics and which candidate it places next. Each trial gets its own
//! strategy instance with its own RNG.
//!
//! # Rotation
//!
//! [`RotationStrategy`] draws one offset in `0..=MAX_ROTATION_OFFSET`
//! when it is created. Every pick takes one representative per candidate
//! collection and selects index `(trial_index + offset) % len`, so
//! different trials rotate through the candidates differently at no
//! per-pick RNG cost.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::{Application, CollectionKey, MultiMap, Topic, TopicId};

/// Upper bound (inclusive) of the per-trial rotation offset.
pub const MAX_ROTATION_OFFSET: usize = 256;

/// Supplies a trial's randomized choices.
pub trait PlacementStrategy {
    /// Order in which the trial visits topics. Must name every topic once.
    fn topic_visit_order(&mut self, topics: &[Topic], trial_index: usize) -> Vec<TopicId>;

    /// Picks the next application to place and removes its collection
    /// from `candidates`. Returns `None` when there is nothing to pick.
    fn pick_next(
        &mut self,
        candidates: &mut MultiMap<CollectionKey, Application>,
        trial_index: usize,
    ) -> Option<Application>;
}

/// Shuffled topic order plus offset rotation over candidates.
///
/// # Example
/// ```
/// use u_assign::models::{Application, CollectionKey, MultiMap};
/// use u_assign::trial::{PlacementStrategy, RotationStrategy};
///
/// let mut strategy = RotationStrategy::from_seed(7).with_offset(1);
/// let mut candidates: MultiMap<CollectionKey, Application> = [
///     Application::new(1, 1, 1, 10),
///     Application::new(2, 2, 1, 10),
/// ]
/// .into_iter()
/// .map(|a| (a.collection_key(), a))
/// .collect();
///
/// let picked = strategy.pick_next(&mut candidates, 0).unwrap();
/// assert_eq!(picked.id, 2);
/// assert_eq!(candidates.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RotationStrategy<R: Rng = SmallRng> {
    rng: R,
    offset: usize,
}

impl<R: Rng> RotationStrategy<R> {
    /// Creates a strategy and draws its rotation offset from `rng`.
    pub fn new(mut rng: R) -> Self {
        let offset = rng.random_range(0..=MAX_ROTATION_OFFSET);
        Self { rng, offset }
    }

    /// Overrides the rotation offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// The rotation offset.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl RotationStrategy<SmallRng> {
    /// Reproducible strategy from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    /// Strategy seeded from the thread-local generator.
    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_rng(&mut rand::rng()))
    }
}

impl<R: Rng> PlacementStrategy for RotationStrategy<R> {
    fn topic_visit_order(&mut self, topics: &[Topic], _trial_index: usize) -> Vec<TopicId> {
        let mut order: Vec<TopicId> = topics.iter().map(|t| t.id).collect();
        order.shuffle(&mut self.rng);
        order
    }

    fn pick_next(
        &mut self,
        candidates: &mut MultiMap<CollectionKey, Application>,
        trial_index: usize,
    ) -> Option<Application> {
        let representatives: Vec<Application> = candidates
            .iter()
            .filter_map(|(_, apps)| apps.first().copied())
            .collect();
        if representatives.is_empty() {
            return None;
        }
        let index = trial_index.wrapping_add(self.offset) % representatives.len();
        let chosen = representatives[index];
        candidates.remove(&chosen.collection_key());
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(apps: &[Application]) -> MultiMap<CollectionKey, Application> {
        apps.iter().map(|a| (a.collection_key(), *a)).collect()
    }

    fn topics(n: u64) -> Vec<Topic> {
        (1..=n).map(Topic::new).collect()
    }

    #[test]
    fn test_offset_in_range() {
        for seed in 0..50 {
            let s = RotationStrategy::from_seed(seed);
            assert!(s.offset() <= MAX_ROTATION_OFFSET);
        }
    }

    #[test]
    fn test_visit_order_is_permutation() {
        let mut s = RotationStrategy::from_seed(42);
        let ts = topics(20);
        let mut order = s.topic_visit_order(&ts, 0);
        order.sort_unstable();
        assert_eq!(order, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_visit_order_reshuffles() {
        let ts = topics(20);
        let mut s = RotationStrategy::from_seed(1);
        let first = s.topic_visit_order(&ts, 0);
        let orders: Vec<_> = (1..10).map(|i| s.topic_visit_order(&ts, i)).collect();
        assert!(orders.iter().any(|o| *o != first));
    }

    #[test]
    fn test_seeded_strategies_repeat() {
        let ts = topics(10);
        let mut a = RotationStrategy::from_seed(9);
        let mut b = RotationStrategy::from_seed(9);
        assert_eq!(a.offset(), b.offset());
        assert_eq!(a.topic_visit_order(&ts, 3), b.topic_visit_order(&ts, 3));
    }

    #[test]
    fn test_pick_uses_rotation_index() {
        let apps = [
            Application::new(1, 1, 1, 10),
            Application::new(2, 2, 1, 10),
            Application::new(3, 3, 1, 10),
        ];

        let mut s = RotationStrategy::from_seed(0).with_offset(0);
        let mut c = candidates(&apps);
        assert_eq!(s.pick_next(&mut c, 0).map(|a| a.id), Some(1));

        let mut c = candidates(&apps);
        assert_eq!(s.pick_next(&mut c, 4).map(|a| a.id), Some(2));

        let mut s = RotationStrategy::from_seed(0).with_offset(256);
        let mut c = candidates(&apps);
        // (1 + 256) % 3 == 2
        assert_eq!(s.pick_next(&mut c, 1).map(|a| a.id), Some(3));
    }

    #[test]
    fn test_pick_one_representative_per_collection() {
        // Group 1 applied twice in collection 1 (same topic).
        let apps = [
            Application::new(1, 1, 1, 10),
            Application::new(2, 1, 1, 10),
            Application::new(3, 2, 1, 10),
        ];
        let mut s = RotationStrategy::from_seed(0).with_offset(0);
        let mut c = candidates(&apps);

        assert_eq!(s.pick_next(&mut c, 0).map(|a| a.id), Some(1));
        assert_eq!(c.len(), 1);
        assert_eq!(s.pick_next(&mut c, 0).map(|a| a.id), Some(3));
        assert!(s.pick_next(&mut c, 0).is_none());
    }
}
