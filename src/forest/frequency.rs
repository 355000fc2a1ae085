//! Self-counting frequency forest.
//!
//! Tracks per-key access counts and keeps each level's keys filed in a
//! frequency-ordered index, so the coldest key of any level is always one
//! probe away. Frequent keys climb toward level 0: on a skewed workload
//! their expected comparison cost is that of searching the top level alone.
//!
//! ## Architecture
//!
//! ```text
//!   level L dictionary                 level L frequency index
//!   BTreeMap<K, u32 (frequency)>      FrequencyIndex {(freq, key)}
//!         │                                   ▲
//!         └── metadata records the ───────────┘
//!             frequency the key is filed under
//!
//!   find hit:  bump frequency, climb while freq > min_freq(level above),
//!              then compact the target and refill the source
//!   overflow:  demote minimum-frequency keys to the next level
//!   underflow: pull the minimum-frequency key of the level above
//! ```
//!
//! Cross-level ordering invariant: after an operation settles, the coldest
//! key of a level is no colder than the hottest key of any deeper level.

use crate::capacity::Capacity;
use crate::ds::FrequencyIndex;
use crate::error::InvariantError;
use crate::forest::skeleton::SearchForest;
use crate::stats::ForestStats;

/// Ordered key set that promotes keys by observed access frequency.
#[derive(Debug)]
pub struct FrequencyForest<K> {
    forest: SearchForest<K, u32>,
    frequencies: Vec<FrequencyIndex<K>>,
}

impl<K> FrequencyForest<K>
where
    K: Ord + Clone,
{
    /// Creates an empty forest with the given capacity band policies.
    pub fn new(min_capacity: Capacity, max_capacity: Capacity) -> Self {
        Self {
            forest: SearchForest::new(min_capacity, max_capacity),
            frequencies: vec![FrequencyIndex::new()],
        }
    }

    /// Inserts a key with frequency 0 and returns its level.
    ///
    /// New keys land at the tail; they earn their way up through `find`.
    /// A key already present keeps its placement, which is returned.
    pub fn insert(&mut self, key: K) -> usize {
        self.insert_with_frequency(key, 0)
    }

    /// Inserts a key with a starting frequency and returns its level.
    ///
    /// Walks up from the tail while the starting frequency is at least the
    /// minimum frequency of the level above, so pre-warmed keys start near
    /// peers of the same heat.
    pub fn insert_with_frequency(&mut self, key: K, frequency: u32) -> usize {
        if let Some(existing) = self.forest.level_of(&key) {
            return existing;
        }

        let mut level = self.forest.tail();
        while level > 0
            && frequency > 0
            && self.frequencies[level - 1]
                .min_freq()
                .map_or(true, |min| frequency >= min)
        {
            level -= 1;
        }

        self.frequencies[level].insert(frequency, key.clone());
        self.forest.insert_raw(key.clone(), frequency, level);
        self.sync_aux();
        self.compact_level(level);
        self.forest.level_of(&key).unwrap_or(level)
    }

    /// Looks up a key, probing from level 0.
    pub fn find(&mut self, key: &K) -> Option<usize> {
        self.find_hinted(key, 0)
    }

    /// Looks up a key, probing from `hint`, and returns its level after any
    /// promotion.
    ///
    /// A hit bumps the key's frequency and climbs it while the new frequency
    /// exceeds the minimum frequency of the level above; the promotion
    /// target is then compacted and the vacated level refilled.
    pub fn find_hinted(&mut self, key: &K, hint: usize) -> Option<usize> {
        let level = self.forest.find(key, hint)?;

        let freq = *self
            .forest
            .metadata(level, key)
            .expect("found key lost its metadata");
        let new_freq = self.frequencies[level]
            .bump(freq, key)
            .expect("frequency index out of sync with level");
        *self
            .forest
            .metadata_mut(level, key)
            .expect("found key lost its metadata") = new_freq;

        let mut target = level;
        while target > 0
            && self.frequencies[target - 1]
                .min_freq()
                .map_or(true, |min| new_freq > min)
        {
            target -= 1;
        }

        if target == level {
            return Some(level);
        }

        self.move_key(key.clone(), level, target, new_freq);
        self.compact_level(target);
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
                let freq = self
                    .forest
                    .remove_at(key, level)
                    .expect("found key vanished before removal");
                self.frequencies[level].remove(freq, key);
                self.fill_level(level);
                true
            },
            None => false,
        }
    }

    /// The recorded access frequency of `key`, if present.
    pub fn frequency(&self, key: &K) -> Option<u32> {
        self.forest.get(key).map(|(_, freq)| *freq)
    }

    /// Minimum frequency on `level`; `None` for empty or out-of-range levels.
    pub fn min_frequency(&self, level: usize) -> Option<u32> {
        self.frequencies.get(level)?.min_freq()
    }

    /// Maximum frequency on `level`; `None` for empty or out-of-range levels.
    pub fn max_frequency(&self, level: usize) -> Option<u32> {
        self.frequencies.get(level)?.max_freq()
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
        for index in &mut self.frequencies {
            index.clear();
        }
    }

    /// Verifies skeleton invariants plus frequency metadata consistency and
    /// the cross-level frequency ordering.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.forest.check_sizes()?;
        self.forest.check_envelope()?;

        for level in 0..self.forest.levels() {
            let index = &self.frequencies[level];
            if index.len() != self.forest.level_len(level) {
                return Err(InvariantError::new(format!(
                    "level {level}: frequency index holds {} entries, dictionary {}",
                    index.len(),
                    self.forest.level_len(level)
                )));
            }
            for (key, freq) in self.forest.entries_at(level) {
                if !index.contains(*freq, key) {
                    return Err(InvariantError::new(format!(
                        "level {level}: key filed under frequency {freq} missing from index"
                    )));
                }
            }
        }

        for level in 0..self.forest.levels() - 1 {
            if let (Some(upper_min), Some(lower_max)) = (
                self.frequencies[level].min_freq(),
                self.frequencies[level + 1].max_freq(),
            ) {
                if upper_min < lower_max {
                    return Err(InvariantError::new(format!(
                        "levels {level}/{}: min frequency {upper_min} below deeper max {lower_max}",
                        level + 1
                    )));
                }
            }
        }
        Ok(())
    }

    fn sync_aux(&mut self) {
        while self.frequencies.len() < self.forest.levels() {
            self.frequencies.push(FrequencyIndex::new());
        }
    }

    fn move_key(&mut self, key: K, from: usize, to: usize, frequency: u32) {
        let recorded = self
            .forest
            .remove_at(&key, from)
            .expect("moving a key that is not on its level");
        self.frequencies[from].remove(recorded, &key);
        self.forest.insert_raw(key.clone(), frequency, to);
        self.sync_aux();
        self.frequencies[to].insert(frequency, key);
    }

    /// Demotes minimum-frequency keys out of an overflowed level until it is
    /// back at its min capacity, then cascades.
    fn compact_level(&mut self, level: usize) {
        let (min_cap, max_cap) = self.forest.capacity(level);
        let mut size = self.forest.level_len(level);
        if size <= max_cap {
            return;
        }

        while size > min_cap {
            let Some((freq, key)) = self.frequencies[level]
                .min()
                .map(|(freq, key)| (freq, key.clone()))
            else {
                break;
            };
            self.move_key(key, level, level + 1, freq);
            size -= 1;
        }

        self.compact_level(level + 1);
    }

    /// Refills an under-full middle level with the coldest key of the level
    /// above, cascading upward.
    fn fill_level(&mut self, level: usize) {
        if level == 0 || level >= self.forest.tail() {
            return;
        }
        if self.forest.level_len(level) >= self.forest.capacity(level).0 {
            return;
        }

        let Some((freq, key)) = self.frequencies[level - 1]
            .min()
            .map(|(freq, key)| (freq, key.clone()))
        else {
            return;
        };
        self.move_key(key, level - 1, level, freq);
        self.fill_level(level - 1);
    }
}

impl<K> crate::traits::CoreForest<K> for FrequencyForest<K>
where
    K: Ord + Clone,
{
    fn len(&self) -> usize {
        FrequencyForest::len(self)
    }

    fn levels(&self) -> usize {
        FrequencyForest::levels(self)
    }

    fn level_len(&self, level: usize) -> usize {
        FrequencyForest::level_len(self, level)
    }

    fn capacity(&self, level: usize) -> (usize, usize) {
        FrequencyForest::capacity(self, level)
    }

    fn contains(&self, key: &K) -> bool {
        FrequencyForest::contains(self, key)
    }

    fn level_of(&self, key: &K) -> Option<usize> {
        FrequencyForest::level_of(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        FrequencyForest::remove(self, key)
    }

    fn clear(&mut self) {
        FrequencyForest::clear(self)
    }

    fn stats(&self) -> ForestStats {
        FrequencyForest::stats(self)
    }
}

impl<K> crate::traits::SelfTuningForest<K> for FrequencyForest<K>
where
    K: Ord + Clone,
{
    fn insert(&mut self, key: K) -> usize {
        FrequencyForest::insert(self, key)
    }

    fn find_hinted(&mut self, key: &K, hint: usize) -> Option<usize> {
        FrequencyForest::find_hinted(self, key, hint)
    }
}
