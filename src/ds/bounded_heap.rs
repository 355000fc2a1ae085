//! Bounded selector for the `k` highest-scored entries of a single pass.
//!
//! Keeps a min-heap of at most `limit` entries; a new entry only displaces
//! the current minimum when its score is strictly larger. Learned forest
//! compaction uses this to pull the coldest `size - min_cap` keys out of an
//! overflowed level in one scan.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Scored<K, S> {
    score: S,
    key: K,
}

impl<K: Ord, S: Ord> PartialEq for Scored<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.key == other.key
    }
}

impl<K: Ord, S: Ord> Eq for Scored<K, S> {}

impl<K: Ord, S: Ord> PartialOrd for Scored<K, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, S: Ord> Ord for Scored<K, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.score.cmp(&other.score) {
            Ordering::Equal => self.key.cmp(&other.key),
            ordering => ordering,
        }
    }
}

/// Single-pass "keep the `limit` largest" heap.
#[derive(Debug)]
pub struct BoundedMaxHeap<K, S> {
    heap: BinaryHeap<Reverse<Scored<K, S>>>,
    limit: usize,
}

impl<K, S> BoundedMaxHeap<K, S>
where
    K: Ord,
    S: Ord + Copy,
{
    /// Creates a selector that retains at most `limit` entries.
    pub fn new(limit: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(limit.saturating_add(1)),
            limit,
        }
    }

    /// Returns the number of retained entries.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the retention limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Offers an entry; it is retained if the heap has room or its score
    /// strictly exceeds the smallest retained score.
    pub fn push(&mut self, key: K, score: S) {
        if self.limit == 0 {
            return;
        }
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(Scored { score, key }));
            return;
        }
        if let Some(Reverse(smallest)) = self.heap.peek() {
            if score > smallest.score {
                self.heap.pop();
                self.heap.push(Reverse(Scored { score, key }));
            }
        }
    }

    /// Consumes the selector and returns the retained `(key, score)` pairs,
    /// smallest score first.
    pub fn into_entries(self) -> Vec<(K, S)> {
        let mut entries: Vec<(K, S)> = self
            .heap
            .into_iter()
            .map(|Reverse(scored)| (scored.key, scored.score))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_heap_keeps_largest_scores() {
        let mut heap = BoundedMaxHeap::new(2);
        heap.push("a", 1);
        heap.push("b", 5);
        heap.push("c", 3);
        heap.push("d", 4);

        let kept = heap.into_entries();
        assert_eq!(kept, vec![("d", 4), ("b", 5)]);
    }

    #[test]
    fn bounded_heap_under_limit_keeps_everything() {
        let mut heap = BoundedMaxHeap::new(10);
        heap.push("a", 2);
        heap.push("b", 1);
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.into_entries(), vec![("b", 1), ("a", 2)]);
    }

    #[test]
    fn bounded_heap_zero_limit_retains_nothing() {
        let mut heap = BoundedMaxHeap::new(0);
        heap.push("a", 100);
        assert!(heap.is_empty());
        assert_eq!(heap.limit(), 0);
        assert!(heap.into_entries().is_empty());
    }

    #[test]
    fn bounded_heap_equal_score_does_not_displace() {
        let mut heap = BoundedMaxHeap::new(1);
        heap.push("a", 5);
        heap.push("b", 5);
        assert_eq!(heap.into_entries(), vec![("a", 5)]);
    }

    #[test]
    fn bounded_heap_entries_sorted_by_score() {
        let mut heap = BoundedMaxHeap::new(4);
        heap.push(10u64, 7u32);
        heap.push(20u64, 2u32);
        heap.push(30u64, 9u32);
        heap.push(40u64, 4u32);
        let scores: Vec<u32> = heap.into_entries().into_iter().map(|(_, s)| s).collect();
        assert_eq!(scores, vec![2, 4, 7, 9]);
    }
}
