//! Forest skeleton: the level vector and its capacity discipline.
//!
//! A [`SearchForest`] distributes keys across a sequence of geometrically
//! growing levels, each an ordered dictionary mapping keys to per-variant
//! metadata. Level 0 is the hottest; the last level (the tail) is the
//! coldest and the only one allowed to run over its capacity band.
//!
//! ## Architecture
//!
//! ```text
//!   level 0   BTreeMap<K, M>   [min_cap(0), max_cap(0)]   hottest
//!   level 1   BTreeMap<K, M>   [min_cap(1), max_cap(1)]
//!   …
//!   level T   BTreeMap<K, M>   unbounded                  tail (grows on demand)
//!
//!   find(key, hint):  probe hint, hint+1, … T   (forward fan)
//!   insert overflow:  count a compaction, demote excess to the next level
//!   erase underflow:  count a promotion; a variant may refill the level
//! ```
//!
//! Used directly, the skeleton is a plain hinted forest: its own compactor
//! demotes keys in dictionary order. The frequency and recency variants layer
//! their per-level auxiliary structures on top and drive placement through
//! the raw insert/remove primitives instead.
//!
//! Counters (compactions, promotions, mispredictions) are per-forest
//! [`StatCell`]s, observable through [`SearchForest::stats`].

use std::collections::BTreeMap;

use crate::capacity::Capacity;
use crate::error::InvariantError;
use crate::stats::{ForestStats, StatCell};

/// Ordered key set spread over geometrically growing levels.
///
/// `M` is the per-variant metadata stored alongside each key; the plain
/// skeleton uses `()`. A key lives in exactly one level at a time.
#[derive(Debug)]
pub struct SearchForest<K, M = ()> {
    levels: Vec<BTreeMap<K, M>>,
    min_capacity: Capacity,
    max_capacity: Capacity,
    total: usize,
    compactions: StatCell,
    promotions: StatCell,
    mispredictions: StatCell,
}

impl<K, M> SearchForest<K, M>
where
    K: Ord,
{
    /// Creates a forest with one empty level and the given capacity band
    /// policies. `max_capacity` is expected to dominate `min_capacity`
    /// level-for-level; [`ForestBuilder`](crate::builder::ForestBuilder)
    /// validates this for callers that want checked construction.
    pub fn new(min_capacity: Capacity, max_capacity: Capacity) -> Self {
        Self {
            levels: vec![BTreeMap::new()],
            min_capacity,
            max_capacity,
            total: 0,
            compactions: StatCell::new(),
            promotions: StatCell::new(),
            mispredictions: StatCell::new(),
        }
    }

    /// Total number of keys across all levels.
    pub fn len(&self) -> usize {
        self.total
    }

    /// Returns `true` if the forest holds no keys.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of live levels. Grows on demand, never shrinks.
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Index of the tail (coldest) level.
    pub fn tail(&self) -> usize {
        self.levels.len() - 1
    }

    /// Number of keys at `level`; 0 for out-of-range levels.
    pub fn level_len(&self, level: usize) -> usize {
        self.levels.get(level).map(|l| l.len()).unwrap_or(0)
    }

    /// The `(min, max)` capacity band of `level`.
    pub fn capacity(&self, level: usize) -> (usize, usize) {
        (self.min_capacity.at(level), self.max_capacity.at(level))
    }

    /// The policy bounding level sizes from below.
    pub fn min_capacity(&self) -> &Capacity {
        &self.min_capacity
    }

    /// The policy bounding level sizes from above.
    pub fn max_capacity(&self) -> &Capacity {
        &self.max_capacity
    }

    /// Returns `true` if some level holds `key`. Does not touch counters.
    pub fn contains(&self, key: &K) -> bool {
        self.levels.iter().any(|level| level.contains_key(key))
    }

    /// Quiet probe: the level holding `key` and its metadata, counter-free.
    pub fn get(&self, key: &K) -> Option<(usize, &M)> {
        self.levels
            .iter()
            .enumerate()
            .find_map(|(idx, level)| level.get(key).map(|meta| (idx, meta)))
    }

    /// Quiet probe for the level holding `key`.
    pub fn level_of(&self, key: &K) -> Option<usize> {
        self.get(key).map(|(level, _)| level)
    }

    /// Probes levels `hint, hint+1, …, tail` and returns the hit level.
    ///
    /// A hint past the tail is clamped to the tail. A hit at any level other
    /// than the hinted one counts as a misprediction. Absence is reported as
    /// `None`, never as a panic.
    pub fn find(&self, key: &K, hint: usize) -> Option<usize> {
        let start = hint.min(self.tail());
        for level in start..self.levels.len() {
            if self.levels[level].contains_key(key) {
                if level != hint {
                    self.mispredictions.incr();
                }
                return Some(level);
            }
        }
        None
    }

    /// Inserts a key at `level`, demoting dictionary-order excess if the
    /// level overflows. Returns the level the key was placed at; the default
    /// compactor may immediately demote it further if it sorted first.
    ///
    /// A key already present anywhere keeps its current placement, which is
    /// returned unchanged.
    pub fn insert(&mut self, key: K, meta: M, level: usize) -> usize {
        if let Some(existing) = self.level_of(&key) {
            return existing;
        }
        self.insert_raw(key, meta, level);
        self.compact_dictionary(level);
        level
    }

    /// Removes `key`, probing from level 0. Returns `false` if absent.
    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_hinted(key, 0)
    }

    /// Removes `key`, probing from `hint`. Returns `false` if absent.
    pub fn remove_hinted(&mut self, key: &K, hint: usize) -> bool {
        match self.find(key, hint) {
            Some(level) => {
                self.remove_at(key, level);
                true
            },
            None => false,
        }
    }

    /// Iterates all keys by (level ascending, key ascending).
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.levels.iter().flat_map(|level| level.keys())
    }

    /// Iterates `(level, key)` pairs by (level ascending, key ascending).
    pub fn iter_with_levels(&self) -> impl Iterator<Item = (usize, &K)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .flat_map(|(idx, level)| level.keys().map(move |key| (idx, key)))
    }

    /// Iterates the keys of one level in dictionary order; empty for
    /// out-of-range levels.
    pub fn iter_level(&self, level: usize) -> impl Iterator<Item = &K> + '_ {
        self.levels.get(level).into_iter().flat_map(|l| l.keys())
    }

    /// First key of the lowest-indexed non-empty level, with its level.
    pub fn first(&self) -> Option<(usize, &K)> {
        self.levels
            .iter()
            .enumerate()
            .find_map(|(idx, level)| level.keys().next().map(|key| (idx, key)))
    }

    /// Drops all keys. Live level count is retained: levels never shrink.
    pub fn clear(&mut self) {
        for level in &mut self.levels {
            level.clear();
        }
        self.total = 0;
    }

    /// Snapshot of the self-tuning counters and current gauges.
    pub fn stats(&self) -> ForestStats {
        ForestStats {
            compactions: self.compactions.get(),
            promotions: self.promotions.get(),
            mispredictions: self.mispredictions.get(),
            len: self.total,
            levels: self.levels.len(),
        }
    }

    /// Zeroes the counters; gauges are unaffected.
    pub fn reset_stats(&self) {
        self.compactions.reset();
        self.promotions.reset();
        self.mispredictions.reset();
    }

    /// Verifies the skeleton invariants: level sizes sum to `len()`, every
    /// key lives in exactly one level, and every non-tail level is within
    /// its max capacity.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.check_sizes()?;
        self.check_envelope()
    }

    // ------------------------------------------------------------------
    // Variant-facing primitives
    // ------------------------------------------------------------------

    /// Inserts without compacting, growing the level vector as needed.
    ///
    /// Counts a compaction the moment the level crosses its max capacity;
    /// the caller is expected to run its compactor next. The key must not be
    /// present anywhere in the forest.
    pub(crate) fn insert_raw(&mut self, key: K, meta: M, level: usize) {
        while level >= self.levels.len() {
            self.levels.push(BTreeMap::new());
        }
        let max_cap = self.max_capacity.at(level);
        self.levels[level].insert(key, meta);
        self.total += 1;
        if max_cap != usize::MAX && self.levels[level].len() == max_cap + 1 {
            self.compactions.incr();
        }
    }

    /// Removes a key known to live at `level` and returns its metadata.
    ///
    /// Counts a promotion when a non-tail level is left under its min
    /// capacity; the caller decides whether to refill.
    pub(crate) fn remove_at(&mut self, key: &K, level: usize) -> Option<M> {
        let meta = self.levels.get_mut(level)?.remove(key)?;
        self.total -= 1;
        if level != self.tail() && self.levels[level].len() < self.min_capacity.at(level) {
            self.promotions.incr();
        }
        Some(meta)
    }

    /// Iterates `(key, metadata)` entries of one level.
    pub(crate) fn entries_at(&self, level: usize) -> impl Iterator<Item = (&K, &M)> + '_ {
        self.levels.get(level).into_iter().flatten()
    }

    /// Metadata of `key` at `level`, if present there.
    pub(crate) fn metadata(&self, level: usize, key: &K) -> Option<&M> {
        self.levels.get(level)?.get(key)
    }

    /// Mutable metadata of `key` at `level`, if present there.
    pub(crate) fn metadata_mut(&mut self, level: usize, key: &K) -> Option<&mut M> {
        self.levels.get_mut(level)?.get_mut(key)
    }

    pub(crate) fn check_sizes(&self) -> Result<(), InvariantError> {
        let summed: usize = self.levels.iter().map(|level| level.len()).sum();
        if summed != self.total {
            return Err(InvariantError::new(format!(
                "level sizes sum to {summed} but total is {}",
                self.total
            )));
        }

        let mut keys: Vec<&K> = self.iter().collect();
        keys.sort();
        for pair in keys.windows(2) {
            if pair[0] == pair[1] {
                return Err(InvariantError::new("a key is present in two levels"));
            }
        }
        Ok(())
    }

    pub(crate) fn check_envelope(&self) -> Result<(), InvariantError> {
        for level in 0..self.tail() {
            let size = self.levels[level].len();
            let max_cap = self.max_capacity.at(level);
            if size > max_cap {
                return Err(InvariantError::new(format!(
                    "level {level} holds {size} keys, max capacity {max_cap}"
                )));
            }
        }
        Ok(())
    }

    /// Default compactor: demote dictionary-order excess down the forest
    /// until every touched level is back inside its band. Appends a fresh
    /// tail the first time a demotion needs a target past the current one.
    fn compact_dictionary(&mut self, start: usize) {
        let mut level = start;
        loop {
            let (min_cap, max_cap) = self.capacity(level);
            if self.levels[level].len() <= max_cap {
                return;
            }
            let excess = self.levels[level].len().saturating_sub(min_cap);
            if excess == 0 {
                return;
            }
            for _ in 0..excess {
                match self.levels[level].pop_first() {
                    Some((key, meta)) => {
                        self.total -= 1;
                        self.insert_raw(key, meta, level + 1);
                    },
                    None => return,
                }
            }
            level += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_forest() -> SearchForest<u32> {
        // top size 4 keeps tests readable: bands are [4,8], [4,8], … at the top
        let min = Capacity::try_new(1.0, 1.1, 4).unwrap();
        let max = Capacity::try_new(2.0, 1.1, 4).unwrap();
        SearchForest::new(min, max)
    }

    #[test]
    fn forest_starts_with_one_empty_level() {
        let forest = small_forest();
        assert_eq!(forest.levels(), 1);
        assert_eq!(forest.len(), 0);
        assert!(forest.is_empty());
        assert_eq!(forest.level_len(0), 0);
        assert_eq!(forest.level_len(7), 0);
    }

    #[test]
    fn forest_insert_and_find_roundtrip() {
        let mut forest = small_forest();
        forest.insert(5, (), 0);
        forest.insert(3, (), 0);

        assert_eq!(forest.find(&5, 0), Some(0));
        assert_eq!(forest.find(&3, 0), Some(0));
        assert_eq!(forest.find(&99, 0), None);
        assert_eq!(forest.len(), 2);
    }

    #[test]
    fn forest_insert_grows_levels_on_demand() {
        let mut forest = small_forest();
        forest.insert(1, (), 3);
        assert_eq!(forest.levels(), 4);
        assert_eq!(forest.find(&1, 0), Some(3));
    }

    #[test]
    fn forest_overflow_compacts_in_dictionary_order() {
        let mut forest = small_forest();
        // max_cap(0) = 8; the 9th key triggers a demotion of the smallest.
        for key in 0..9 {
            forest.insert(key, (), 0);
        }

        assert!(forest.levels() >= 2);
        let (min_cap, max_cap) = forest.capacity(0);
        assert!(forest.level_len(0) <= max_cap);
        assert_eq!(forest.level_len(0), min_cap);
        assert!(forest.stats().compactions > 0);

        // The smallest keys went down, the largest stayed.
        assert_eq!(forest.find(&8, 0), Some(0));
        assert!(forest.find(&0, 0).unwrap() > 0);
        forest.check_invariants().unwrap();
    }

    #[test]
    fn forest_duplicate_insert_keeps_placement() {
        let mut forest = small_forest();
        forest.insert(7, (), 2);
        let level = forest.insert(7, (), 0);
        assert_eq!(level, 2);
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn forest_find_counts_mispredictions() {
        let mut forest = small_forest();
        forest.insert(1, (), 2);
        assert_eq!(forest.stats().mispredictions, 0);

        assert_eq!(forest.find(&1, 2), Some(2));
        assert_eq!(forest.stats().mispredictions, 0);

        assert_eq!(forest.find(&1, 0), Some(2));
        assert_eq!(forest.stats().mispredictions, 1);

        // A miss does not count as a misprediction.
        assert_eq!(forest.find(&9, 0), None);
        assert_eq!(forest.stats().mispredictions, 1);
    }

    #[test]
    fn forest_find_clamps_hint_to_tail() {
        let mut forest = small_forest();
        forest.insert(1, (), 0);
        assert_eq!(forest.find(&1, 100), Some(0));
        assert_eq!(forest.stats().mispredictions, 1);
    }

    #[test]
    fn forest_hint_skips_hotter_levels() {
        let mut forest = small_forest();
        forest.insert(1, (), 0);
        forest.insert(2, (), 2);
        // Forward fan never looks above the hint.
        assert_eq!(forest.find(&1, 1), None);
        assert_eq!(forest.find(&2, 1), Some(2));
    }

    #[test]
    fn forest_remove_decrements_and_reports_absence() {
        let mut forest = small_forest();
        forest.insert(1, (), 0);
        forest.insert(2, (), 0);

        assert!(forest.remove(&1));
        assert!(!forest.remove(&1));
        assert_eq!(forest.len(), 1);
        assert!(!forest.contains(&1));
        assert!(forest.contains(&2));
    }

    #[test]
    fn forest_remove_counts_promotions_on_underflow() {
        let mut forest = small_forest();
        for key in 0..9 {
            forest.insert(key, (), 0);
        }
        // Level 0 sits at min_cap(0) = 4 after compaction; one removal
        // drops it below and counts a promotion.
        let victim = *forest.iter_level(0).next().unwrap();
        assert!(forest.remove(&victim));
        assert_eq!(forest.stats().promotions, 1);
    }

    #[test]
    fn forest_tail_removal_never_counts_promotion() {
        let mut forest = small_forest();
        forest.insert(1, (), 0);
        assert!(forest.remove(&1));
        assert_eq!(forest.stats().promotions, 0);
    }

    #[test]
    fn forest_iteration_is_level_then_key_ordered() {
        let mut forest = small_forest();
        forest.insert(5, (), 0);
        forest.insert(2, (), 0);
        forest.insert(9, (), 1);
        forest.insert(1, (), 1);

        let keys: Vec<u32> = forest.iter().copied().collect();
        assert_eq!(keys, vec![2, 5, 1, 9]);

        let with_levels: Vec<(usize, u32)> =
            forest.iter_with_levels().map(|(l, k)| (l, *k)).collect();
        assert_eq!(with_levels, vec![(0, 2), (0, 5), (1, 1), (1, 9)]);

        assert_eq!(forest.first(), Some((0, &2)));
    }

    #[test]
    fn forest_first_skips_empty_levels() {
        let mut forest = small_forest();
        forest.insert(9, (), 2);
        assert_eq!(forest.first(), Some((2, &9)));
    }

    #[test]
    fn forest_clear_keeps_levels() {
        let mut forest = small_forest();
        for key in 0..20 {
            forest.insert(key, (), 0);
        }
        let levels_before = forest.levels();
        forest.clear();
        assert!(forest.is_empty());
        assert_eq!(forest.levels(), levels_before);
    }

    #[test]
    fn forest_stats_reset_zeroes_counters() {
        let mut forest = small_forest();
        for key in 0..9 {
            forest.insert(key, (), 0);
        }
        forest.find(&8, 3);
        assert!(forest.stats().compactions > 0);

        forest.reset_stats();
        let stats = forest.stats();
        assert_eq!(stats.compactions, 0);
        assert_eq!(stats.promotions, 0);
        assert_eq!(stats.mispredictions, 0);
        assert_eq!(stats.len, forest.len());
    }

    #[test]
    fn forest_invariants_hold_after_mixed_operations() {
        let mut forest = small_forest();
        for key in 0..50 {
            forest.insert(key, (), 0);
            forest.check_invariants().unwrap();
        }
        for key in (0..50).step_by(3) {
            forest.remove(&key);
            forest.check_invariants().unwrap();
        }
    }
}
