//! Bounded per-stream FIFO ring buffer (`spec.md` §4.1, component C2).
//!
//! Oldest-first iteration, O(1) push, O(k) drain where `k` is the number of
//! elements touched. The buffer never reorders on insert: an ingest batch
//! that violates monotonicity is still accepted in arrival order (see the
//! "FIFO monotonicity on ingest" decision in `SPEC_FULL.md` §9).

use crate::error::SyncerError;
use crate::measurement::Measurement;
use std::collections::VecDeque;

/// Result of [`RingBuffer::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    Ok,
    Full,
}

#[derive(Debug, Clone)]
pub struct RingBuffer<T: Measurement> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Measurement> RingBuffer<T> {
    /// Construct a buffer with a fixed capacity. `capacity == 0` is rejected
    /// with [`SyncerError::InvalidArgument`], per `spec.md` §4.1.
    pub fn new(stream: &'static str, capacity: usize) -> Result<Self, SyncerError> {
        if capacity == 0 {
            return Err(SyncerError::InvalidArgument { stream, capacity });
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Appends `item` unless the buffer is already at capacity, in which
    /// case nothing is inserted and [`PushResult::Full`] is returned.
    pub fn push(&mut self, item: T) -> PushResult {
        if self.items.len() >= self.capacity {
            return PushResult::Full;
        }
        self.items.push_back(item);
        PushResult::Ok
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn peek_front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fraction of capacity occupied, for the usage metric in `spec.md` §6.
    pub fn usage(&self) -> f64 {
        self.items.len() as f64 / self.capacity as f64
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Oldest-first iteration, front is oldest / back is newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Removes and returns, in FIFO order, every element matching `pred`,
    /// wherever it sits in the buffer. Used both for the adapter-facing
    /// `drain_before` contract (`pred: |m| m.timestamp() <= limit`) and for
    /// stale eviction (`pred: |m| m.timestamp() < threshold`).
    pub fn drain_matching<F: Fn(&T) -> bool>(&mut self, pred: F) -> Vec<T> {
        let mut removed = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if pred(&item) {
                removed.push(item);
            } else {
                remaining.push_back(item);
            }
        }
        self.items = remaining;
        removed
    }

    /// `spec.md` §4.1's `drain_before`: remove and return, FIFO ordered, all
    /// elements with `timestamp <= limit`.
    pub fn drain_before(&mut self, limit: i64) -> Vec<T> {
        self.drain_matching(|m| m.timestamp() <= limit)
    }

    /// Scans front-to-back for the newest measurement with
    /// `timestamp <= target`. On a tie the one inserted later (closer to the
    /// back) wins, per the §4.4.5 tie-break rule.
    pub fn find_best_match(&self, target: i64) -> Option<&T> {
        let mut best: Option<&T> = None;
        for item in &self.items {
            if item.timestamp() <= target {
                best = Some(item);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{Accuracy, GravityMeasurement};

    fn sample(ts: i64) -> GravityMeasurement {
        GravityMeasurement::new(0.0, 0.0, 9.8, ts, Accuracy::High)
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(RingBuffer::<GravityMeasurement>::new("gravity", 0).is_err());
    }

    #[test]
    fn push_reports_full_without_inserting() {
        let mut ring = RingBuffer::new("gravity", 2).unwrap();
        assert_eq!(ring.push(sample(1)), PushResult::Ok);
        assert_eq!(ring.push(sample(2)), PushResult::Ok);
        assert_eq!(ring.push(sample(3)), PushResult::Full);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn fifo_ordering_preserved() {
        let mut ring = RingBuffer::new("gravity", 4).unwrap();
        for ts in [10, 20, 30] {
            ring.push(sample(ts));
        }
        let order: Vec<i64> = ring.iter().map(|m| m.timestamp()).collect();
        assert_eq!(order, vec![10, 20, 30]);
        assert_eq!(ring.pop_front().unwrap().timestamp(), 10);
    }

    #[test]
    fn find_best_match_prefers_latest_qualifying() {
        let mut ring = RingBuffer::new("gravity", 4).unwrap();
        for ts in [10, 20, 30] {
            ring.push(sample(ts));
        }
        assert_eq!(ring.find_best_match(25).unwrap().timestamp(), 20);
        assert_eq!(ring.find_best_match(30).unwrap().timestamp(), 30);
        assert!(ring.find_best_match(5).is_none());
    }

    #[test]
    fn drain_matching_removes_regardless_of_position() {
        let mut ring = RingBuffer::new("gravity", 4).unwrap();
        for ts in [10, 20, 30, 40] {
            ring.push(sample(ts));
        }
        let removed = ring.drain_matching(|m| m.timestamp() < 25);
        assert_eq!(
            removed.iter().map(|m| m.timestamp()).collect::<Vec<_>>(),
            vec![10, 20]
        );
        assert_eq!(
            ring.iter().map(|m| m.timestamp()).collect::<Vec<_>>(),
            vec![30, 40]
        );
    }
}
