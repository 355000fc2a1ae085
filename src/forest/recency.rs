//! Self-counting recency forest.
//!
//! Keeps each level's keys threaded on an access-ordered list (head = most
//! recent) and floats any found key to the head of level 0, so the working
//! set gathers at the top the way an LRU keeps it at the front. Overflow
//! demotes from the least-recent end of a level's list; underflow pulls the
//! least-recent key of the level above.
//!
//! Key metadata is the key's [`NodeId`] in its level's list; the list and
//! dictionary always hold exactly the same keys.

use crate::capacity::Capacity;
use crate::ds::{AccessList, NodeId};
use crate::error::InvariantError;
use crate::forest::skeleton::SearchForest;
use crate::stats::ForestStats;

/// Ordered key set that promotes keys by recency of access.
#[derive(Debug)]
pub struct RecencyForest<K> {
    forest: SearchForest<K, NodeId>,
    recencies: Vec<AccessList<K>>,
}

impl<K> RecencyForest<K>
where
    K: Ord + Clone,
{
    /// Creates an empty forest with the given capacity band policies.
    pub fn new(min_capacity: Capacity, max_capacity: Capacity) -> Self {
        Self {
            forest: SearchForest::new(min_capacity, max_capacity),
            recencies: vec![AccessList::new()],
        }
    }

    /// Inserts a key at the most-recent end of the tail level and returns
    /// its level. A key already present keeps its placement.
    pub fn insert(&mut self, key: K) -> usize {
        if let Some(existing) = self.forest.level_of(&key) {
            return existing;
        }

        let tail = self.forest.tail();
        let node = self.recencies[tail].push_front(key.clone());
        self.forest.insert_raw(key.clone(), node, tail);
        self.sync_aux();
        self.compact_level(tail);
        self.forest.level_of(&key).unwrap_or(tail)
    }

    /// Looks up a key, probing from level 0.
    pub fn find(&mut self, key: &K) -> Option<usize> {
        self.find_hinted(key, 0)
    }

    /// Looks up a key, probing from `hint`, and returns its level after the
    /// move-to-top.
    ///
    /// A hit below level 0 splices the key to the head of level 0, compacts
    /// level 0, and refills the vacated level. A hit at level 0 leaves the
    /// list order untouched.
    pub fn find_hinted(&mut self, key: &K, hint: usize) -> Option<usize> {
        let level = self.forest.find(key, hint)?;
        if level == 0 {
            return Some(0);
        }

        self.move_key(key.clone(), level, 0);
        self.compact_level(0);
        self.fill_level(level);
        self.forest.level_of(key)
    }

    /// Removes a key, probing from level 0. Returns `false` if absent.
    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_hinted(key, 0)
    }

    /// Removes a key, probing from `hint`, then refills the vacated level.
    pub fn remove_hinted(&mut self, key: &K, hint: usize) -> bool {
        match self.forest.find(key, hint) {
            Some(level) => {
                let node = self
                    .forest
                    .remove_at(key, level)
                    .expect("found key vanished before removal");
                self.recencies[level].remove(node);
                self.fill_level(level);
                true
            },
            None => false,
        }
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

    /// Most recently touched key on `level`.
    pub fn most_recent(&self, level: usize) -> Option<&K> {
        self.recencies.get(level)?.front()
    }

    /// Least recently touched key on `level`, the next demotion victim.
    pub fn least_recent(&self, level: usize) -> Option<&K> {
        self.recencies.get(level)?.back()
    }

    /// Iterates all keys by (level ascending, key ascending).
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.forest.iter()
    }

    /// Iterates one level's keys from most to least recently touched.
    pub fn iter_level_by_recency(&self, level: usize) -> impl Iterator<Item = &K> + '_ {
        self.recencies.get(level).into_iter().flat_map(|l| l.iter())
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
        for list in &mut self.recencies {
            list.clear();
        }
    }

    /// Verifies skeleton invariants plus list metadata consistency.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.forest.check_sizes()?;
        self.forest.check_envelope()?;

        for level in 0..self.forest.levels() {
            let list = &self.recencies[level];
            if list.len() != self.forest.level_len(level) {
                return Err(InvariantError::new(format!(
                    "level {level}: access list holds {} nodes, dictionary {}",
                    list.len(),
                    self.forest.level_len(level)
                )));
            }
            for (key, node) in self.forest.entries_at(level) {
                match list.get(*node) {
                    Some(listed) if listed == key => {},
                    Some(_) => {
                        return Err(InvariantError::new(format!(
                            "level {level}: node handle resolves to a different key"
                        )));
                    },
                    None => {
                        return Err(InvariantError::new(format!(
                            "level {level}: dangling node handle"
                        )));
                    },
                }
            }
        }
        Ok(())
    }

    fn sync_aux(&mut self) {
        while self.recencies.len() < self.forest.levels() {
            self.recencies.push(AccessList::new());
        }
    }

    /// Splices a key to the most-recent end of another level.
    fn move_key(&mut self, key: K, from: usize, to: usize) {
        while self.recencies.len() <= to {
            self.recencies.push(AccessList::new());
        }
        let node = self
            .forest
            .remove_at(&key, from)
            .expect("moving a key that is not on its level");
        let owned = self.recencies[from]
            .remove(node)
            .expect("access list out of sync with level");
        let renewed = self.recencies[to].push_front(owned);
        self.forest.insert_raw(key, renewed, to);
        self.sync_aux();
    }

    /// Demotes least-recent keys out of an overflowed level until it is back
    /// at its min capacity, then cascades.
    fn compact_level(&mut self, level: usize) {
        let (min_cap, max_cap) = self.forest.capacity(level);
        let mut size = self.forest.level_len(level);
        if size <= max_cap {
            return;
        }

        while size > min_cap {
            let Some(victim) = self.recencies[level].back().cloned() else {
                break;
            };
            self.move_key(victim, level, level + 1);
            size -= 1;
        }

        self.compact_level(level + 1);
    }

    /// Refills an under-full middle level with the least-recent key of the
    /// level above, cascading upward.
    fn fill_level(&mut self, level: usize) {
        if level == 0 || level >= self.forest.tail() {
            return;
        }
        if self.forest.level_len(level) >= self.forest.capacity(level).0 {
            return;
        }

        let Some(victim) = self.recencies[level - 1].back().cloned() else {
            return;
        };
        self.move_key(victim, level - 1, level);
        self.fill_level(level - 1);
    }
}

impl<K> crate::traits::CoreForest<K> for RecencyForest<K>
where
    K: Ord + Clone,
{
    fn len(&self) -> usize {
        RecencyForest::len(self)
    }

    fn levels(&self) -> usize {
        RecencyForest::levels(self)
    }

    fn level_len(&self, level: usize) -> usize {
        RecencyForest::level_len(self, level)
    }

    fn capacity(&self, level: usize) -> (usize, usize) {
        RecencyForest::capacity(self, level)
    }

    fn contains(&self, key: &K) -> bool {
        RecencyForest::contains(self, key)
    }

    fn level_of(&self, key: &K) -> Option<usize> {
        RecencyForest::level_of(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        RecencyForest::remove(self, key)
    }

    fn clear(&mut self) {
        RecencyForest::clear(self)
    }

    fn stats(&self) -> ForestStats {
        RecencyForest::stats(self)
    }
}

impl<K> crate::traits::SelfTuningForest<K> for RecencyForest<K>
where
    K: Ord + Clone,
{
    fn insert(&mut self, key: K) -> usize {
        RecencyForest::insert(self, key)
    }

    fn find_hinted(&mut self, key: &K, hint: usize) -> Option<usize> {
        RecencyForest::find_hinted(self, key, hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_forest() -> RecencyForest<u32> {
        let min = Capacity::try_new(1.0, 1.1, 4).unwrap();
        let max = Capacity::try_new(2.0, 1.1, 4).unwrap();
        RecencyForest::new(min, max)
    }

    #[test]
    fn recency_forest_insert_is_most_recent_at_tail() {
        let mut forest = small_forest();
        forest.insert(1);
        forest.insert(2);
        assert_eq!(forest.most_recent(0), Some(&2));
        assert_eq!(forest.least_recent(0), Some(&1));
        assert_eq!(forest.len(), 2);
    }

    #[test]
    fn recency_forest_find_floats_key_to_level_zero() {
        let mut forest = small_forest();
        for key in 0..40 {
            forest.insert(key);
        }
        assert!(forest.levels() > 1);
        // Early keys were demoted by the insert flood.
        let deep = forest.level_of(&0).unwrap();
        assert!(deep > 0);

        assert_eq!(forest.find(&0), Some(0));
        assert_eq!(forest.most_recent(0), Some(&0));
        forest.check_invariants().unwrap();
    }

    #[test]
    fn recency_forest_find_at_level_zero_keeps_order() {
        let mut forest = small_forest();
        forest.insert(1);
        forest.insert(2);
        assert_eq!(forest.find(&1), Some(0));
        // A level-0 hit does not reorder the list.
        assert_eq!(forest.most_recent(0), Some(&2));
    }

    #[test]
    fn recency_forest_find_missing_is_none() {
        let mut forest = small_forest();
        forest.insert(1);
        assert_eq!(forest.find(&9), None);
    }

    #[test]
    fn recency_forest_overflow_demotes_least_recent() {
        let mut forest = small_forest();
        // max_cap(0) = 8: the 9th insert compacts level 0 down to 4 keys,
        // demoting the 5 least recently inserted.
        for key in 0..9 {
            forest.insert(key);
        }
        assert_eq!(forest.levels(), 2);
        assert_eq!(forest.level_len(0), 4);
        for key in 0..5u32 {
            assert_eq!(forest.level_of(&key), Some(1));
        }
        for key in 5..9u32 {
            assert_eq!(forest.level_of(&key), Some(0));
        }
        forest.check_invariants().unwrap();
    }

    #[test]
    fn recency_forest_accessed_keys_survive_demotion() {
        let mut forest = small_forest();
        for key in 0..9 {
            forest.insert(key);
        }
        // Key 0 was demoted by the overflow; touching it floats it back to
        // the head of level 0, out of the next demotion's reach.
        assert_eq!(forest.find(&0), Some(0));
        for key in 9..14 {
            forest.insert(key);
        }

        assert_eq!(forest.level_of(&0), Some(0));
        assert!(forest.level_of(&1).unwrap() > 0);
        forest.check_invariants().unwrap();
    }

    #[test]
    fn recency_forest_duplicate_insert_keeps_placement() {
        let mut forest = small_forest();
        for key in 0..9 {
            forest.insert(key);
        }
        let level = forest.level_of(&0).unwrap();
        assert_eq!(forest.insert(0), level);
        assert_eq!(forest.len(), 9);
        forest.check_invariants().unwrap();
    }

    #[test]
    fn recency_forest_remove_cleans_list() {
        let mut forest = small_forest();
        for key in 0..20 {
            forest.insert(key);
        }
        assert!(forest.remove(&3));
        assert!(!forest.remove(&3));
        assert!(!forest.contains(&3));
        forest.check_invariants().unwrap();
    }

    #[test]
    fn recency_forest_remove_refills_middle_levels() {
        let mut forest = small_forest();
        for key in 0..40 {
            forest.insert(key);
        }
        assert!(forest.levels() >= 3);

        let victims: Vec<u32> = forest.iter_level_by_recency(1).copied().collect();
        for victim in victims {
            forest.remove(&victim);
            forest.check_invariants().unwrap();
        }
    }

    #[test]
    fn recency_forest_later_access_never_sits_deeper() {
        let mut forest = small_forest();
        for key in 0..30 {
            forest.insert(key);
        }
        forest.find(&3);
        forest.find(&17);
        // 17 was accessed after 3, so it may not sit strictly deeper.
        assert!(forest.level_of(&17).unwrap() <= forest.level_of(&3).unwrap());
        forest.check_invariants().unwrap();
    }

    #[test]
    fn recency_forest_clear_resets_keys_and_lists() {
        let mut forest = small_forest();
        for key in 0..20 {
            forest.insert(key);
        }
        forest.clear();
        assert!(forest.is_empty());
        assert_eq!(forest.most_recent(0), None);
        assert_eq!(forest.find(&3), None);
        forest.check_invariants().unwrap();
    }
}
