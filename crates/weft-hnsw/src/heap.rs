//! Bounded dual-ended distance heap.
//!
//! Layer search needs both ends of two ordered sets at once: the frontier
//! pops its closest vertex to expand and evicts its farthest when it outgrows
//! `ef_search`, while the result set is peeked at its minimum (for the
//! termination rule) and evicted at its maximum (when a better candidate
//! arrives). A single [`BoundedHeap`] serves both roles: a binary min-heap
//! ordered by distance, with a linear-scan maximum for the rare far end.
//!
//! Distances are ordered with `f32::total_cmp`, so NaN sorts above every
//! finite distance and the ordering is total and deterministic.

use crate::node::Candidate;
use std::cmp::Ordering;

/// A binary min-heap of search candidates ordered by distance.
#[derive(Debug)]
pub(crate) struct BoundedHeap<K> {
    items: Vec<Candidate<K>>,
}

impl<K: Ord + Clone> BoundedHeap<K> {
    /// Create an empty heap with room for `capacity` candidates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The closest candidate, if any.
    pub fn min(&self) -> Option<&Candidate<K>> {
        self.items.first()
    }

    /// The farthest candidate, if any.
    pub fn max(&self) -> Option<&Candidate<K>> {
        self.items
            .iter()
            .max_by(|a, b| a.dist.total_cmp(&b.dist))
    }

    /// Insert a candidate.
    pub fn push(&mut self, candidate: Candidate<K>) {
        self.items.push(candidate);
        self.sift_up(self.items.len() - 1);
    }

    /// Remove and return the closest candidate.
    pub fn pop(&mut self) -> Option<Candidate<K>> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let out = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        out
    }

    /// Remove and return the farthest candidate.
    pub fn pop_last(&mut self) -> Option<Candidate<K>> {
        if self.items.is_empty() {
            return None;
        }
        let worst = self
            .items
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.dist.total_cmp(&b.dist))
            .map(|(i, _)| i)?;

        let out = self.items.swap_remove(worst);
        if worst < self.items.len() {
            // The displaced tail element may violate the heap property in
            // either direction.
            let settled = self.sift_up(worst);
            if settled == worst {
                self.sift_down(worst);
            }
        }
        Some(out)
    }

    /// Drain the heap into a vector sorted ascending by distance.
    pub fn into_sorted_vec(mut self) -> Vec<Candidate<K>> {
        let mut out = Vec::with_capacity(self.items.len());
        while let Some(candidate) = self.pop() {
            out.push(candidate);
        }
        out
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.items[a].dist.total_cmp(&self.items[b].dist) == Ordering::Less
    }

    /// Move the element at `i` up until its parent is no farther. Returns the
    /// final index.
    fn sift_up(&mut self, mut i: usize) -> usize {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(i, parent) {
                break;
            }
            self.items.swap(i, parent);
            i = parent;
        }
        i
    }

    /// Move the element at `i` down until both children are no closer.
    fn sift_down(&mut self, mut i: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && self.less(right, left) {
                child = right;
            }
            if !self.less(child, i) {
                break;
            }
            self.items.swap(i, child);
            i = child;
        }
    }
}
