//! Unified forest builder for all placement policies.
//!
//! Provides a single entry point to create forests with different placement
//! policies behind one API, hiding the per-variant insert/find signatures.
//!
//! ## Example
//!
//! ```rust
//! use forestkit::builder::{ForestBuilder, ForestPolicy};
//!
//! let mut forest = ForestBuilder::new()
//!     .try_build::<u64>(ForestPolicy::Frequency)
//!     .unwrap();
//! forest.insert(1, None);
//! assert_eq!(forest.find(&1, None), Some(0));
//! ```

use crate::capacity::{Capacity, DEFAULT_BASE, DEFAULT_TOP_SIZE};
use crate::error::ConfigError;
use crate::forest::{
    FrequencyForest, LearnedFrequencyForest, LearnedRecencyForest, RecencyForest,
};
use crate::predict::NO_PREDICTION;
use crate::stats::ForestStats;

/// Available placement policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForestPolicy {
    /// Self-counting: promote by observed access frequency.
    Frequency,
    /// Caller-ranked: place by an externally supplied popularity rank.
    LearnedFrequency,
    /// Self-counting: float accessed keys to the top, LRU-style.
    Recency,
    /// Caller-predicted: place by predicted next-access distance.
    LearnedRecency,
}

/// Unified forest wrapper with a policy-independent API.
///
/// The optional `prediction` argument is interpreted per policy:
///
/// | Policy | `insert` prediction | `find` prediction |
/// |--------|--------------------|-------------------|
/// | `Frequency` | starting frequency (default 0) | ignored |
/// | `LearnedFrequency` | rank (default tail) | probe hint |
/// | `Recency` | ignored | ignored |
/// | `LearnedRecency` | next-access distance (default tail) | probe hint and new distance |
pub struct Forest<K>
where
    K: Ord + Clone,
{
    inner: ForestInner<K>,
}

enum ForestInner<K>
where
    K: Ord + Clone,
{
    Frequency(FrequencyForest<K>),
    LearnedFrequency(LearnedFrequencyForest<K>),
    Recency(RecencyForest<K>),
    LearnedRecency(LearnedRecencyForest<K>),
}

impl<K> Forest<K>
where
    K: Ord + Clone,
{
    /// Inserts a key and returns its level. Duplicates keep their placement.
    pub fn insert(&mut self, key: K, prediction: Option<u32>) -> usize {
        match &mut self.inner {
            ForestInner::Frequency(forest) => {
                forest.insert_with_frequency(key, prediction.unwrap_or(0))
            },
            ForestInner::LearnedFrequency(forest) => {
                forest.insert(key, prediction.unwrap_or(NO_PREDICTION))
            },
            ForestInner::Recency(forest) => forest.insert(key),
            ForestInner::LearnedRecency(forest) => {
                forest.insert(key, prediction.unwrap_or(NO_PREDICTION))
            },
        }
    }

    /// Looks up a key and returns its level after any policy-driven move.
    pub fn find(&mut self, key: &K, prediction: Option<u32>) -> Option<usize> {
        match &mut self.inner {
            ForestInner::Frequency(forest) => forest.find(key),
            ForestInner::LearnedFrequency(forest) => {
                forest.find(key, prediction.unwrap_or(NO_PREDICTION))
            },
            ForestInner::Recency(forest) => forest.find(key),
            ForestInner::LearnedRecency(forest) => {
                let prediction = prediction.unwrap_or(NO_PREDICTION);
                forest.find(key, prediction, prediction)
            },
        }
    }

    /// Removes a key. Returns `false` if absent.
    pub fn remove(&mut self, key: &K) -> bool {
        match &mut self.inner {
            ForestInner::Frequency(forest) => forest.remove(key),
            ForestInner::LearnedFrequency(forest) => forest.remove(key),
            ForestInner::Recency(forest) => forest.remove(key),
            ForestInner::LearnedRecency(forest) => forest.remove(key),
        }
    }

    /// Total number of keys.
    pub fn len(&self) -> usize {
        match &self.inner {
            ForestInner::Frequency(forest) => forest.len(),
            ForestInner::LearnedFrequency(forest) => forest.len(),
            ForestInner::Recency(forest) => forest.len(),
            ForestInner::LearnedRecency(forest) => forest.len(),
        }
    }

    /// Returns `true` if the forest holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live levels.
    pub fn levels(&self) -> usize {
        match &self.inner {
            ForestInner::Frequency(forest) => forest.levels(),
            ForestInner::LearnedFrequency(forest) => forest.levels(),
            ForestInner::Recency(forest) => forest.levels(),
            ForestInner::LearnedRecency(forest) => forest.levels(),
        }
    }

    /// Number of keys at `level`; 0 for out-of-range levels.
    pub fn level_len(&self, level: usize) -> usize {
        match &self.inner {
            ForestInner::Frequency(forest) => forest.level_len(level),
            ForestInner::LearnedFrequency(forest) => forest.level_len(level),
            ForestInner::Recency(forest) => forest.level_len(level),
            ForestInner::LearnedRecency(forest) => forest.level_len(level),
        }
    }

    /// The `(min, max)` capacity band of `level`.
    pub fn capacity(&self, level: usize) -> (usize, usize) {
        match &self.inner {
            ForestInner::Frequency(forest) => forest.capacity(level),
            ForestInner::LearnedFrequency(forest) => forest.capacity(level),
            ForestInner::Recency(forest) => forest.capacity(level),
            ForestInner::LearnedRecency(forest) => forest.capacity(level),
        }
    }

    /// Returns `true` if some level holds `key`.
    pub fn contains(&self, key: &K) -> bool {
        match &self.inner {
            ForestInner::Frequency(forest) => forest.contains(key),
            ForestInner::LearnedFrequency(forest) => forest.contains(key),
            ForestInner::Recency(forest) => forest.contains(key),
            ForestInner::LearnedRecency(forest) => forest.contains(key),
        }
    }

    /// Quiet probe for the level holding `key`.
    pub fn level_of(&self, key: &K) -> Option<usize> {
        match &self.inner {
            ForestInner::Frequency(forest) => forest.level_of(key),
            ForestInner::LearnedFrequency(forest) => forest.level_of(key),
            ForestInner::Recency(forest) => forest.level_of(key),
            ForestInner::LearnedRecency(forest) => forest.level_of(key),
        }
    }

    /// Snapshot of the self-tuning counters.
    pub fn stats(&self) -> ForestStats {
        match &self.inner {
            ForestInner::Frequency(forest) => forest.stats(),
            ForestInner::LearnedFrequency(forest) => forest.stats(),
            ForestInner::Recency(forest) => forest.stats(),
            ForestInner::LearnedRecency(forest) => forest.stats(),
        }
    }

    /// Drops all keys.
    pub fn clear(&mut self) {
        match &mut self.inner {
            ForestInner::Frequency(forest) => forest.clear(),
            ForestInner::LearnedFrequency(forest) => forest.clear(),
            ForestInner::Recency(forest) => forest.clear(),
            ForestInner::LearnedRecency(forest) => forest.clear(),
        }
    }

    /// The policy this forest was built with.
    pub fn policy(&self) -> ForestPolicy {
        match &self.inner {
            ForestInner::Frequency(_) => ForestPolicy::Frequency,
            ForestInner::LearnedFrequency(_) => ForestPolicy::LearnedFrequency,
            ForestInner::Recency(_) => ForestPolicy::Recency,
            ForestInner::LearnedRecency(_) => ForestPolicy::LearnedRecency,
        }
    }
}

/// Builder for forest instances.
///
/// Defaults: top size 256, base 1.1, fill factors 1.0 (min) and 2.0 (max).
#[derive(Debug, Clone)]
pub struct ForestBuilder {
    top_size: usize,
    base: f64,
    min_fill: f64,
    max_fill: f64,
}

impl ForestBuilder {
    /// Creates a builder with the default geometry.
    pub fn new() -> Self {
        Self {
            top_size: DEFAULT_TOP_SIZE,
            base: DEFAULT_BASE,
            min_fill: 1.0,
            max_fill: 2.0,
        }
    }

    /// Sets the level-0 size at fill factor 1.0.
    pub fn top_size(mut self, top_size: usize) -> Self {
        self.top_size = top_size;
        self
    }

    /// Sets the double-exponential growth base.
    pub fn base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }

    /// Sets the min/max fill factors bounding each level's capacity band.
    pub fn fill_factors(mut self, min_fill: f64, max_fill: f64) -> Self {
        self.min_fill = min_fill;
        self.max_fill = max_fill;
        self
    }

    /// Builds a forest with the given policy, validating the geometry.
    ///
    /// # Example
    ///
    /// ```rust
    /// use forestkit::builder::{ForestBuilder, ForestPolicy};
    ///
    /// let forest = ForestBuilder::new()
    ///     .top_size(64)
    ///     .fill_factors(1.0, 1.5)
    ///     .try_build::<u64>(ForestPolicy::Recency)
    ///     .unwrap();
    /// assert_eq!(forest.levels(), 1);
    /// ```
    pub fn try_build<K>(&self, policy: ForestPolicy) -> Result<Forest<K>, ConfigError>
    where
        K: Ord + Clone,
    {
        if self.min_fill >= self.max_fill {
            return Err(ConfigError::new(format!(
                "min fill factor {} must be below max fill factor {}",
                self.min_fill, self.max_fill
            )));
        }
        let min = Capacity::try_new(self.min_fill, self.base, self.top_size)?;
        let max = Capacity::try_new(self.max_fill, self.base, self.top_size)?;

        let inner = match policy {
            ForestPolicy::Frequency => ForestInner::Frequency(FrequencyForest::new(min, max)),
            ForestPolicy::LearnedFrequency => {
                ForestInner::LearnedFrequency(LearnedFrequencyForest::new(min, max))
            },
            ForestPolicy::Recency => ForestInner::Recency(RecencyForest::new(min, max)),
            ForestPolicy::LearnedRecency => {
                ForestInner::LearnedRecency(LearnedRecencyForest::new(min, max))
            },
        };

        Ok(Forest { inner })
    }
}

impl Default for ForestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
