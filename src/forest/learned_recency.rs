//! Next-access-hinted recency forest.
//!
//! The caller predicts, per access, how many distinct accesses will pass
//! before each key is seen again (a Belady-style reuse distance). Keys are
//! placed on the level whose cumulative min-capacity band covers that
//! distance; on every hit the prediction is refreshed and the key re-placed.
//! [`NO_PREDICTION`] ("never again") routes to the tail.
//!
//! Unlike the rank-hinted frequency variant, compaction here applies to any
//! overflowed level and cascades, using a bounded max-heap pass over the
//! stored next-access distances (larger = colder).

use crate::capacity::Capacity;
use crate::ds::BoundedMaxHeap;
use crate::error::InvariantError;
use crate::forest::skeleton::SearchForest;
use crate::predict::{prediction_to_level, NO_PREDICTION};
use crate::stats::ForestStats;

/// Ordered key set placed by predicted next-access distance.
#[derive(Debug)]
pub struct LearnedRecencyForest<K> {
    forest: SearchForest<K, u32>,
}

impl<K> LearnedRecencyForest<K>
where
    K: Ord + Clone,
{
    /// Creates an empty forest with the given capacity band policies.
    pub fn new(min_capacity: Capacity, max_capacity: Capacity) -> Self {
        Self {
            forest: SearchForest::new(min_capacity, max_capacity),
        }
    }

    /// Inserts a key at the level its predicted next access maps to and
    /// returns its level. A key already present keeps its placement.
    pub fn insert(&mut self, key: K, next_access: u32) -> usize {
        if let Some(existing) = self.forest.level_of(&key) {
            return existing;
        }

        let level = self.level_for(next_access);
        self.forest.insert_raw(key.clone(), next_access, level);
        self.compact_level(level);
        self.forest.level_of(&key).unwrap_or(level)
    }

    /// Looks up a key, probing from the level the previous prediction maps
    /// to, and re-places it by the new prediction.
    ///
    /// On a hit the stored next-access distance is replaced with
    /// `next_access`; if that maps to a different level the key moves there
    /// and the target is compacted. Returns the key's level afterwards.
    pub fn find(&mut self, key: &K, prev_access: u32, next_access: u32) -> Option<usize> {
        let hint = self.level_for(prev_access);
        let level = self.forest.find(key, hint)?;

        let target = self.level_for(next_access);
        *self
            .forest
            .metadata_mut(level, key)
            .expect("found key lost its metadata") = next_access;

        if level == target {
            return Some(level);
        }

        let stored = self
            .forest
            .remove_at(key, level)
            .expect("found key vanished before move");
        self.forest.insert_raw(key.clone(), stored, target);
        self.compact_level(target);
        self.forest.level_of(key)
    }

    /// Removes a key, probing from level 0. Returns `false` if absent.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.forest.find(key, 0) {
            Some(level) => {
                self.forest.remove_at(key, level);
                true
            },
            None => false,
        }
    }

    /// Removes a key, probing from the level its last prediction maps to.
    pub fn remove_hinted(&mut self, key: &K, prev_access: u32) -> bool {
        match self.forest.find(key, self.level_for(prev_access)) {
            Some(level) => {
                self.forest.remove_at(key, level);
                true
            },
            None => false,
        }
    }

    /// The next-access distance recorded for `key`, if present.
    pub fn next_access(&self, key: &K) -> Option<u32> {
        self.forest.get(key).map(|(_, next)| *next)
    }

    /// Total number of keys.
    pub fn len(&self) -> usize {
        self.forest.len()
    }

    /// Returns `true` if the forest holds no keys.
    pub fn is_empty(&self) -> bool {
        self.forest.is_empty()
    }

    /// Number of live levels.
    pub fn levels(&self) -> usize {
        self.forest.levels()
    }

    /// Number of keys at `level`; 0 for out-of-range levels.
    pub fn level_len(&self, level: usize) -> usize {
        self.forest.level_len(level)
    }

    /// The `(min, max)` capacity band of `level`.
    pub fn capacity(&self, level: usize) -> (usize, usize) {
        self.forest.capacity(level)
    }

    /// Returns `true` if some level holds `key`. Does not touch counters.
    pub fn contains(&self, key: &K) -> bool {
        self.forest.contains(key)
    }

    /// Quiet probe for the level holding `key`.
    pub fn level_of(&self, key: &K) -> Option<usize> {
        self.forest.level_of(key)
    }

    /// Iterates all keys by (level ascending, key ascending).
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.forest.iter()
    }

    /// Iterates the keys of one level in dictionary order.
    pub fn iter_level(&self, level: usize) -> impl Iterator<Item = &K> + '_ {
        self.forest.iter_level(level)
    }

    /// Snapshot of the self-tuning counters.
    pub fn stats(&self) -> ForestStats {
        self.forest.stats()
    }

    /// Zeroes the counters.
    pub fn reset_stats(&self) {
        self.forest.reset_stats()
    }

    /// Drops all keys, retaining the live level count.
    pub fn clear(&mut self) {
        self.forest.clear();
    }

    /// Verifies the skeleton invariants, including the capacity envelope:
    /// unlike the rank-hinted variant, compaction here repairs every level.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.forest.check_sizes()?;
        self.forest.check_envelope()
    }

    fn level_for(&self, prediction: u32) -> usize {
        if prediction == NO_PREDICTION {
            self.forest.tail()
        } else {
            prediction_to_level(prediction as usize, self.forest.min_capacity())
        }
    }

    /// Demotes the `size - min_cap` keys with the largest next-access
    /// distances out of an overflowed level, then cascades.
    fn compact_level(&mut self, level: usize) {
        let (min_cap, max_cap) = self.forest.capacity(level);
        let size = self.forest.level_len(level);
        if size <= max_cap {
            return;
        }

        let mut coldest = BoundedMaxHeap::new(size.saturating_sub(min_cap));
        for (key, next) in self.forest.entries_at(level) {
            coldest.push(key.clone(), *next);
        }
        for (key, next) in coldest.into_entries() {
            self.forest.remove_at(&key, level);
            self.forest.insert_raw(key, next, level + 1);
        }

        self.compact_level(level + 1);
    }
}

impl<K> crate::traits::CoreForest<K> for LearnedRecencyForest<K>
where
    K: Ord + Clone,
{
    fn len(&self) -> usize {
        LearnedRecencyForest::len(self)
    }

    fn levels(&self) -> usize {
        LearnedRecencyForest::levels(self)
    }

    fn level_len(&self, level: usize) -> usize {
        LearnedRecencyForest::level_len(self, level)
    }

    fn capacity(&self, level: usize) -> (usize, usize) {
        LearnedRecencyForest::capacity(self, level)
    }

    fn contains(&self, key: &K) -> bool {
        LearnedRecencyForest::contains(self, key)
    }

    fn level_of(&self, key: &K) -> Option<usize> {
        LearnedRecencyForest::level_of(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        LearnedRecencyForest::remove(self, key)
    }

    fn clear(&mut self) {
        LearnedRecencyForest::clear(self)
    }

    fn stats(&self) -> ForestStats {
        LearnedRecencyForest::stats(self)
    }
}

impl<K> crate::traits::PredictedForest<K> for LearnedRecencyForest<K>
where
    K: Ord + Clone,
{
    fn insert_predicted(&mut self, key: K, prediction: u32) -> usize {
        self.insert(key, prediction)
    }

    /// Uses the prediction as both the probe hint and the re-placement
    /// target.
    fn find_predicted(&mut self, key: &K, prediction: u32) -> Option<usize> {
        self.find(key, prediction, prediction)
    }
}
