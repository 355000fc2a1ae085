//! Prediction plumbing: rank-to-level inversion and the prediction sketch.
//!
//! Learned forest variants place keys by inverting a rank-space prediction
//! through the cumulative capacity partition ([`prediction_to_level`]). When
//! the caller cannot supply predictions directly, [`PredictionSketch`] caches
//! small per-key predictions in a compact count-min-style table.
//!
//! ## Architecture
//!
//! ```text
//!   rank space            cumulative capacity           level index
//!   0 ─────────────────►  [0, cap(0))                   0
//!   cap(0) ────────────►  [cap(0), cap(0)+cap(1))       1
//!   …                     …                             …
//!
//!   PredictionSketch (d rows × w columns)
//!   ┌───────┬───────┬───────┬───────┐
//!   │ 0xFF  │  3*   │ 0xFF  │  12   │   row 0   (* = collision flag set)
//!   │  7    │ 0xFF  │  3*   │ 0xFF  │   row 1
//!   └───────┴───────┴───────┴───────┘
//!   column = ((a[row] · hash(key) + b[row]) mod p) mod w
//! ```
//!
//! ## Operations
//! - `insert(key, value)`: write empty cells, min-merge and flag collisions
//! - `update(key, value)`: overwrite uncollided cells, min-merge otherwise
//! - `get(key)`: max over rows (most conservative under min-aggregation)

use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHasher;

use crate::capacity::Capacity;

/// Sentinel meaning "no prediction available".
///
/// Every learned variant routes this value to the tail level, both on insert
/// and as a probe hint.
pub const NO_PREDICTION: u32 = u32::MAX;

/// Maps a rank-space prediction to the smallest level `L` such that
/// `prediction < cap(0) + cap(1) + … + cap(L)`.
///
/// Monotone in the prediction: a hotter (smaller) prediction never maps to a
/// deeper level. The cumulative sum saturates, so the function terminates for
/// every input; once saturated the current level is returned.
///
/// # Example
///
/// ```
/// use forestkit::capacity::Capacity;
/// use forestkit::predict::prediction_to_level;
///
/// let cap = Capacity::try_new(1.0, 1.1, 256).unwrap();
/// assert_eq!(prediction_to_level(0, &cap), 0);
/// assert_eq!(prediction_to_level(255, &cap), 0);
/// assert!(prediction_to_level(256, &cap) > 0);
/// ```
pub fn prediction_to_level(prediction: usize, capacity: &Capacity) -> usize {
    let mut level = 0;
    let mut offset = 0usize;
    loop {
        offset = offset.saturating_add(capacity.at(level));
        if prediction < offset || offset == usize::MAX {
            return level;
        }
        level += 1;
    }
}

const EMPTY_CELL: u8 = u8::MAX;
const HASH_PRIME: u64 = i32::MAX as u64;
const SALT_SEED: u64 = 2241;

/// Compact count-min-style table caching per-key `u8` predictions.
///
/// Each of the `rows` hash rows indexes `columns` cells with an independent
/// 2-universal hash `((a·x + b) mod p) mod w` over the key's 64-bit hash.
/// Cells min-aggregate on collision and carry a collision flag so later
/// `update`s know whether an overwrite is safe. `get` returns the maximum
/// over rows, the most conservative estimate once collisions have pulled
/// individual cells down; a never-written key reads as [`EMPTY_CELL`]
/// (`0xFF`), which doubles as the "no prediction" value in `u8` space.
///
/// Not on the read path of the basic forests; callers feed its output into
/// the learned variants when ranks are unavailable.
#[derive(Debug, Clone)]
pub struct PredictionSketch<K> {
    table: Vec<Vec<u8>>,
    collided: Vec<Vec<bool>>,
    salt_a: Vec<u64>,
    salt_b: Vec<u64>,
    _key: std::marker::PhantomData<K>,
}

impl<K: Hash> PredictionSketch<K> {
    /// Creates a sketch with `rows` hash rows of `columns` cells each.
    ///
    /// Row salts are drawn from a fixed-seed generator so sketch contents are
    /// reproducible run to run. A sketch with zero rows or columns stores
    /// nothing and reads back empty.
    pub fn new(rows: usize, columns: usize) -> Self {
        let rows = if columns == 0 { 0 } else { rows };
        let mut rng = StdRng::seed_from_u64(SALT_SEED);
        let salt_a = (0..rows).map(|_| rng.gen_range(1..HASH_PRIME)).collect();
        let salt_b = (0..rows).map(|_| rng.gen_range(0..HASH_PRIME)).collect();

        Self {
            table: vec![vec![EMPTY_CELL; columns]; rows],
            collided: vec![vec![false; columns]; rows],
            salt_a,
            salt_b,
            _key: std::marker::PhantomData,
        }
    }

    /// Number of hash rows.
    pub fn rows(&self) -> usize {
        self.table.len()
    }

    /// Number of cells per row.
    pub fn columns(&self) -> usize {
        self.table.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Records a first sighting of `key`.
    ///
    /// Empty cells take `value`; occupied cells min-merge and are flagged as
    /// collided.
    pub fn insert(&mut self, key: &K, value: u8) {
        let hash = Self::hash_key(key);
        for row in 0..self.table.len() {
            let idx = self.index(hash, row);
            let cell = &mut self.table[row][idx];
            if *cell == EMPTY_CELL {
                *cell = value;
            } else {
                *cell = value.min(*cell);
                self.collided[row][idx] = true;
            }
        }
    }

    /// Refreshes the prediction for a key already inserted.
    ///
    /// Uncollided cells are overwritten; collided cells min-merge since the
    /// cell no longer belongs to a single key.
    pub fn update(&mut self, key: &K, value: u8) {
        let hash = Self::hash_key(key);
        for row in 0..self.table.len() {
            let idx = self.index(hash, row);
            let cell = &mut self.table[row][idx];
            if !self.collided[row][idx] {
                *cell = value;
            } else {
                *cell = value.min(*cell);
            }
        }
    }

    /// Returns the prediction for `key`: the maximum cell value over rows.
    ///
    /// A key that was never inserted reads as `0xFF`.
    pub fn get(&self, key: &K) -> u8 {
        let hash = Self::hash_key(key);
        let mut result = 0u8;
        for row in 0..self.table.len() {
            result = result.max(self.table[row][self.index(hash, row)]);
        }
        if self.table.is_empty() {
            EMPTY_CELL
        } else {
            result
        }
    }

    fn index(&self, hash: u64, row: usize) -> usize {
        let mixed = self.salt_a[row]
            .wrapping_mul(hash)
            .wrapping_add(self.salt_b[row]);
        ((mixed % HASH_PRIME) % self.table[row].len() as u64) as usize
    }

    fn hash_key(key: &K) -> u64 {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_capacity() -> Capacity {
        Capacity::try_new(1.0, 1.1, 256).unwrap()
    }

    #[test]
    fn prediction_to_level_partitions_rank_space() {
        let cap = dense_capacity();
        assert_eq!(prediction_to_level(0, &cap), 0);
        assert_eq!(prediction_to_level(255, &cap), 0);
        assert_eq!(prediction_to_level(256, &cap), 1);

        let boundary = cap.cumulative(1);
        assert_eq!(prediction_to_level(boundary - 1, &cap), 1);
        assert_eq!(prediction_to_level(boundary, &cap), 2);
    }

    #[test]
    fn prediction_to_level_is_monotone() {
        let cap = dense_capacity();
        let mut previous = 0;
        for prediction in (0..1_000_000).step_by(997) {
            let level = prediction_to_level(prediction, &cap);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn prediction_to_level_terminates_on_huge_inputs() {
        let cap = dense_capacity();
        let widest = prediction_to_level(usize::MAX, &cap);
        let wide = prediction_to_level(u32::MAX as usize, &cap);
        assert!(widest >= wide);
        assert!(wide > 0);
    }

    #[test]
    fn sketch_round_trips_without_collisions() {
        let mut sketch = PredictionSketch::new(4, 1024);
        sketch.insert(&1u64, 3);
        sketch.insert(&2u64, 7);
        assert_eq!(sketch.get(&1u64), 3);
        assert_eq!(sketch.get(&2u64), 7);
    }

    #[test]
    fn sketch_unknown_key_reads_empty() {
        let sketch: PredictionSketch<u64> = PredictionSketch::new(4, 1024);
        assert_eq!(sketch.get(&99u64), 0xFF);
    }

    #[test]
    fn sketch_collisions_min_aggregate() {
        // A single column forces every key into the same cell of every row.
        let mut sketch = PredictionSketch::new(4, 1);
        sketch.insert(&1u64, 3);
        sketch.insert(&2u64, 5);
        assert_eq!(sketch.get(&1u64), 3);
        assert_eq!(sketch.get(&2u64), 3);
    }

    #[test]
    fn sketch_update_overwrites_uncollided_cells() {
        let mut sketch = PredictionSketch::new(4, 1024);
        sketch.insert(&1u64, 3);
        sketch.update(&1u64, 9);
        assert_eq!(sketch.get(&1u64), 9);
    }

    #[test]
    fn sketch_update_min_merges_collided_cells() {
        let mut sketch = PredictionSketch::new(4, 1);
        sketch.insert(&1u64, 3);
        sketch.insert(&2u64, 5);
        // The shared cell is collided; a larger update cannot raise it.
        sketch.update(&1u64, 10);
        assert_eq!(sketch.get(&1u64), 3);
        // A smaller update still lowers it.
        sketch.update(&2u64, 1);
        assert_eq!(sketch.get(&2u64), 1);
    }

    #[test]
    fn sketch_zero_sized_is_inert() {
        let mut sketch = PredictionSketch::new(0, 1024);
        sketch.insert(&1u64, 3);
        assert_eq!(sketch.get(&1u64), 0xFF);

        let mut sketch = PredictionSketch::new(4, 0);
        sketch.insert(&1u64, 3);
        assert_eq!(sketch.get(&1u64), 0xFF);
    }

    #[test]
    fn sketch_salts_are_reproducible() {
        let a: PredictionSketch<u64> = PredictionSketch::new(4, 64);
        let b: PredictionSketch<u64> = PredictionSketch::new(4, 64);
        assert_eq!(a.salt_a, b.salt_a);
        assert_eq!(a.salt_b, b.salt_b);
    }
}
