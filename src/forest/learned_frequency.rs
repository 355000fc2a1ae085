//! Rank-hinted frequency forest.
//!
//! The caller supplies a rank per key (lower = hotter), typically from an
//! external popularity predictor; the forest places each key on the level
//! whose cumulative min-capacity band covers its rank and probes from that
//! level on lookups. `find` never mutates placement, so a perfect ranking
//! costs zero mispredictions and zero moves.
//!
//! Compaction is tail-only by contract: a non-tail overflow means the
//! ranking disagrees with the capacity partition and is tolerated rather
//! than repaired. When the tail overflows, a bounded max-heap pass selects
//! the highest-ranked (coldest) keys for demotion.

use crate::capacity::Capacity;
use crate::ds::BoundedMaxHeap;
use crate::error::InvariantError;
use crate::forest::skeleton::SearchForest;
use crate::predict::{prediction_to_level, NO_PREDICTION};
use crate::stats::ForestStats;

/// Ordered key set placed by caller-supplied ranks.
#[derive(Debug)]
pub struct LearnedFrequencyForest<K> {
    forest: SearchForest<K, u32>,
}

impl<K> LearnedFrequencyForest<K>
where
    K: Ord + Clone,
{
    /// Creates an empty forest with the given capacity band policies.
    pub fn new(min_capacity: Capacity, max_capacity: Capacity) -> Self {
        Self {
            forest: SearchForest::new(min_capacity, max_capacity),
        }
    }

    /// Inserts a key at the level its rank maps to and returns its level.
    ///
    /// [`NO_PREDICTION`] routes to the tail. A key already present keeps its
    /// placement.
    pub fn insert(&mut self, key: K, rank: u32) -> usize {
        if let Some(existing) = self.forest.level_of(&key) {
            return existing;
        }

        let level = self.level_for(rank);
        self.forest.insert_raw(key.clone(), rank, level);
        self.compact_level(level);
        self.forest.level_of(&key).unwrap_or(level)
    }

    /// Looks up a key, probing from the level its rank maps to.
    ///
    /// Placement is not mutated; the rank is a probe hint only.
    pub fn find(&self, key: &K, rank: u32) -> Option<usize> {
        self.forest.find(key, self.level_for(rank))
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

    /// Removes a key, probing from the level its rank maps to.
    pub fn remove_hinted(&mut self, key: &K, rank: u32) -> bool {
        match self.forest.find(key, self.level_for(rank)) {
            Some(level) => {
                self.forest.remove_at(key, level);
                true
            },
            None => false,
        }
    }

    /// The rank recorded for `key`, if present.
    pub fn rank(&self, key: &K) -> Option<u32> {
        self.forest.get(key).map(|(_, rank)| *rank)
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

    /// Verifies the size and uniqueness invariants.
    ///
    /// The capacity envelope is deliberately not enforced: non-tail levels
    /// may overflow when the ranking disagrees with the partition.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.forest.check_sizes()
    }

    fn level_for(&self, rank: u32) -> usize {
        if rank == NO_PREDICTION {
            self.forest.tail()
        } else {
            prediction_to_level(rank as usize, self.forest.min_capacity())
        }
    }

    /// Tail-only compaction: demote the `size - min_cap` highest-ranked keys
    /// and cascade onto the new tail.
    fn compact_level(&mut self, level: usize) {
        let (min_cap, max_cap) = self.forest.capacity(level);
        let size = self.forest.level_len(level);
        if size <= max_cap || level != self.forest.tail() {
            return;
        }

        let mut coldest = BoundedMaxHeap::new(size.saturating_sub(min_cap));
        for (key, rank) in self.forest.entries_at(level) {
            coldest.push(key.clone(), *rank);
        }
        for (key, rank) in coldest.into_entries() {
            self.forest.remove_at(&key, level);
            self.forest.insert_raw(key, rank, level + 1);
        }

        self.compact_level(level + 1);
    }
}

impl<K> crate::traits::CoreForest<K> for LearnedFrequencyForest<K>
where
    K: Ord + Clone,
{
    fn len(&self) -> usize {
        LearnedFrequencyForest::len(self)
    }

    fn levels(&self) -> usize {
        LearnedFrequencyForest::levels(self)
    }

    fn level_len(&self, level: usize) -> usize {
        LearnedFrequencyForest::level_len(self, level)
    }

    fn capacity(&self, level: usize) -> (usize, usize) {
        LearnedFrequencyForest::capacity(self, level)
    }

    fn contains(&self, key: &K) -> bool {
        LearnedFrequencyForest::contains(self, key)
    }

    fn level_of(&self, key: &K) -> Option<usize> {
        LearnedFrequencyForest::level_of(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        LearnedFrequencyForest::remove(self, key)
    }

    fn clear(&mut self) {
        LearnedFrequencyForest::clear(self)
    }

    fn stats(&self) -> ForestStats {
        LearnedFrequencyForest::stats(self)
    }
}

impl<K> crate::traits::PredictedForest<K> for LearnedFrequencyForest<K>
where
    K: Ord + Clone,
{
    fn insert_predicted(&mut self, key: K, prediction: u32) -> usize {
        self.insert(key, prediction)
    }

    fn find_predicted(&mut self, key: &K, prediction: u32) -> Option<usize> {
        self.find(key, prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_forest() -> LearnedFrequencyForest<u32> {
        let min = Capacity::try_new(1.0, 1.1, 4).unwrap();
        let max = Capacity::try_new(1.1, 1.1, 4).unwrap();
        LearnedFrequencyForest::new(min, max)
    }

    #[test]
    fn learned_frequency_places_by_rank_partition() {
        let mut forest = small_forest();
        // min_cap(0) = 4: ranks 0..4 map to level 0, the next band to level 1.
        assert_eq!(forest.insert(10, 0), 0);
        assert_eq!(forest.insert(11, 3), 0);
        assert_eq!(forest.insert(12, 4), 1);
        assert_eq!(forest.rank(&12), Some(4));
    }

    #[test]
    fn learned_frequency_perfect_ranks_never_mispredict() {
        let mut forest = small_forest();
        for key in 0..200u32 {
            forest.insert(key, key);
        }
        for key in 0..200u32 {
            assert!(forest.find(&key, key).is_some());
        }
        assert_eq!(forest.stats().mispredictions, 0);
        forest.check_invariants().unwrap();
    }

    #[test]
    fn learned_frequency_find_does_not_move_keys() {
        let mut forest = small_forest();
        forest.insert(7, 20);
        let before = forest.level_of(&7).unwrap();
        for _ in 0..10 {
            forest.find(&7, 20);
        }
        assert_eq!(forest.level_of(&7), Some(before));
    }

    #[test]
    fn learned_frequency_stale_rank_still_finds() {
        let mut forest = small_forest();
        for key in 0..40u32 {
            forest.insert(key, key);
        }
        // Probing from a too-hot hint fans forward and still hits.
        assert!(forest.find(&7, 0).is_some());
        // Probing from a too-cold hint misses keys above it.
        assert_eq!(forest.find(&7, 5000), None);
    }

    #[test]
    fn learned_frequency_sentinel_routes_to_tail() {
        let mut forest = small_forest();
        for key in 0..40u32 {
            forest.insert(key, key);
        }
        let tail = forest.levels() - 1;
        assert_eq!(forest.insert(999, NO_PREDICTION), tail);
        assert!(forest.find(&999, NO_PREDICTION).is_some());
    }

    #[test]
    fn learned_frequency_tail_overflow_demotes_worst_ranked() {
        let mut forest = small_forest();
        // All keys claim level 0, which starts as the tail; the first
        // overflow demotes exactly the worst-ranked key.
        for key in 0..5u32 {
            forest.insert(key, key % 4);
        }
        assert_eq!(forest.levels(), 2);
        assert_eq!(forest.level_of(&3), Some(1));
        assert_eq!(forest.level_len(0), 4);
        forest.check_invariants().unwrap();
    }

    #[test]
    fn learned_frequency_non_tail_overflow_is_tolerated() {
        let mut forest = small_forest();
        // Grow a deep tail first, then cram keys into level 0.
        forest.insert(1000, 1000);
        for key in 0..20u32 {
            forest.insert(key, 0);
        }
        let (_, max_cap) = forest.capacity(0);
        assert!(forest.level_len(0) > max_cap);
        forest.check_invariants().unwrap();
    }

    #[test]
    fn learned_frequency_duplicate_insert_keeps_placement() {
        let mut forest = small_forest();
        let level = forest.insert(7, 3);
        assert_eq!(forest.insert(7, 900), level);
        assert_eq!(forest.rank(&7), Some(3));
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn learned_frequency_remove_by_rank_hint() {
        let mut forest = small_forest();
        forest.insert(7, 9);
        assert!(forest.remove_hinted(&7, 9));
        assert!(!forest.contains(&7));
        assert!(!forest.remove(&7));
    }
}
