//! # Forest Trait Hierarchy
//!
//! This module defines the trait hierarchy for the forest variants,
//! providing a unified interface over the two self-counting forests
//! (frequency, recency) and the two prediction-hinted ones, while keeping
//! each variant's placement-policy operations where they belong.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌───────────────────────────────────────────┐
//!                 │             CoreForest<K>                 │
//!                 │                                           │
//!                 │  len / is_empty / levels                  │
//!                 │  level_len(level)   capacity(level)       │
//!                 │  contains(&K)       level_of(&K)          │
//!                 │  remove(&mut, &K)   clear(&mut)           │
//!                 │  stats() → ForestStats                    │
//!                 └──────────────────┬────────────────────────┘
//!                                    │
//!                ┌───────────────────┴───────────────────┐
//!                ▼                                       ▼
//!   ┌─────────────────────────────┐        ┌─────────────────────────────┐
//!   │   SelfTuningForest<K>       │        │   PredictedForest<K>        │
//!   │                             │        │                             │
//!   │  insert(K) → level          │        │  insert_predicted(K, u32)   │
//!   │  find_hinted(&K, hint)      │        │  find_predicted(&K, u32)    │
//!   │  find(&K)  [hint 0]         │        │                             │
//!   │                             │        │  prediction = rank or       │
//!   │  placement tuned by the     │        │  next-access distance;      │
//!   │  forest's own counters      │        │  placement tuned by caller  │
//!   └─────────────────────────────┘        └─────────────────────────────┘
//!        FrequencyForest                       LearnedFrequencyForest
//!        RecencyForest                         LearnedRecencyForest
//! ```
//!
//! ## Design Notes
//!
//! - `find` takes `&mut self` on both branches: self-counting forests move
//!   keys on every hit, and the next-access variant re-places keys by the
//!   fresh prediction. The rank-hinted variant's inherent `find` is
//!   read-only; its trait impl simply forwards.
//! - `remove` probes from level 0. The variants' inherent `remove_hinted`
//!   methods accept a probe hint for callers that kept one.
//! - Prediction semantics differ per variant: a rank for
//!   `LearnedFrequencyForest`, a next-access distance for
//!   `LearnedRecencyForest` (which uses the value as both the probe hint and
//!   the re-placement target). [`NO_PREDICTION`](crate::predict::NO_PREDICTION)
//!   routes to the tail in both.

use crate::stats::ForestStats;

/// Operations every forest variant supports.
///
/// # Example
///
/// ```
/// use forestkit::capacity::Capacity;
/// use forestkit::forest::FrequencyForest;
/// use forestkit::traits::CoreForest;
///
/// fn occupancy<K, F: CoreForest<K>>(forest: &F) -> Vec<usize> {
///     (0..forest.levels()).map(|l| forest.level_len(l)).collect()
/// }
///
/// let min = Capacity::try_new(1.0, 1.1, 256).unwrap();
/// let max = Capacity::try_new(2.0, 1.1, 256).unwrap();
/// let mut forest = FrequencyForest::new(min, max);
/// forest.insert(1u64);
/// assert_eq!(occupancy(&forest), vec![1]);
/// ```
pub trait CoreForest<K> {
    /// Total number of keys across all levels.
    fn len(&self) -> usize;

    /// Returns `true` if the forest holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live levels.
    fn levels(&self) -> usize;

    /// Number of keys at `level`; 0 for out-of-range levels.
    fn level_len(&self, level: usize) -> usize;

    /// The `(min, max)` capacity band of `level`.
    fn capacity(&self, level: usize) -> (usize, usize);

    /// Returns `true` if some level holds `key`, without touching counters.
    fn contains(&self, key: &K) -> bool;

    /// The level holding `key`, without touching counters.
    fn level_of(&self, key: &K) -> Option<usize>;

    /// Removes `key`, probing from level 0. Returns `false` if absent.
    fn remove(&mut self, key: &K) -> bool;

    /// Drops all keys. Live level count is retained.
    fn clear(&mut self);

    /// Snapshot of the self-tuning counters.
    fn stats(&self) -> ForestStats;
}

/// Forests that tune placement from their own observations.
///
/// Implemented by [`FrequencyForest`](crate::forest::FrequencyForest) and
/// [`RecencyForest`](crate::forest::RecencyForest). Every hit may promote
/// the key, so lookups take `&mut self`.
pub trait SelfTuningForest<K>: CoreForest<K> {
    /// Inserts a key and returns its level. Duplicates keep their placement.
    fn insert(&mut self, key: K) -> usize;

    /// Looks up a key probing from `hint`; returns its level after any
    /// promotion the hit triggered.
    fn find_hinted(&mut self, key: &K, hint: usize) -> Option<usize>;

    /// Looks up a key probing from level 0.
    fn find(&mut self, key: &K) -> Option<usize> {
        self.find_hinted(key, 0)
    }
}

/// Forests whose placement is driven by caller-supplied predictions.
///
/// Implemented by
/// [`LearnedFrequencyForest`](crate::forest::LearnedFrequencyForest) (the
/// prediction is a rank, lower = hotter) and
/// [`LearnedRecencyForest`](crate::forest::LearnedRecencyForest) (the
/// prediction is a next-access distance, smaller = sooner).
pub trait PredictedForest<K>: CoreForest<K> {
    /// Inserts a key placed by `prediction` and returns its level.
    fn insert_predicted(&mut self, key: K, prediction: u32) -> usize;

    /// Looks up a key probing from the level `prediction` maps to.
    fn find_predicted(&mut self, key: &K, prediction: u32) -> Option<usize>;
}
