//! Ordered key → list multimap.
//!
//! Open applications are indexed by topic and by collection. Both
//! indexes are `MultiMap`s: a key maps to a non-empty list of values in
//! insertion order. Empty lists are dropped, so `len()` is the number of
//! keys that still hold something.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// An ordered map from keys to non-empty value lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiMap<K: Ord, V> {
    entries: BTreeMap<K, Vec<V>>,
}

impl<K: Ord, V> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> MultiMap<K, V> {
    /// Creates an empty multimap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to the key's list.
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.entry(key).or_default().push(value);
    }

    /// Values for a key (empty if absent).
    pub fn get(&self, key: &K) -> &[V] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Removes a key with all of its values.
    pub fn remove(&mut self, key: &K) -> Option<Vec<V>> {
        self.entries.remove(key)
    }

    /// Keeps only the values of `key` matching the predicate.
    ///
    /// Returns the number of removed values. The key disappears when its
    /// list becomes empty.
    pub fn retain<F>(&mut self, key: &K, mut keep: F) -> usize
    where
        F: FnMut(&V) -> bool,
    {
        let Some(values) = self.entries.get_mut(key) else {
            return 0;
        };
        let before = values.len();
        values.retain(|v| keep(v));
        let removed = before - values.len();
        if values.is_empty() {
            self.entries.remove(key);
        }
        removed
    }

    /// Whether the key holds any value.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of values across all keys.
    pub fn value_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// All values, grouped by key in key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().flatten()
    }

    /// `(key, values)` pairs in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, K, Vec<V>> {
        self.entries.iter()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for MultiMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a MultiMap<K, V> {
    type Item = (&'a K, &'a Vec<V>);
    type IntoIter = btree_map::Iter<'a, K, Vec<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
