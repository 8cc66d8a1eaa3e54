//! In-memory priority queue for pending units.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::util::serde::Priority;

/// A pending entry: its priority, its submission sequence, and what to run.
#[derive(Debug)]
pub struct QueuedUnit<P> {
    /// Dispatch priority (higher first).
    pub priority: Priority,
    /// Submission sequence number; lower means submitted earlier.
    pub seq: u64,
    /// The queued payload.
    pub payload: P,
}

impl<P> PartialEq for QueuedUnit<P> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<P> Eq for QueuedUnit<P> {}

impl<P> PartialOrd for QueuedUnit<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for QueuedUnit<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, then FIFO: the smaller sequence must compare greater
        // because the heap pops its maximum.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Strict priority queue, FIFO among equal priorities.
///
/// O(log n) push and pop. Sequence numbers are assigned by the caller and must be
/// strictly increasing in submission order.
pub struct InMemoryQueue<P> {
    units: BinaryHeap<QueuedUnit<P>>,
}

impl<P> InMemoryQueue<P> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: BinaryHeap::new(),
        }
    }

    /// Add a unit.
    pub fn push(&mut self, unit: QueuedUnit<P>) {
        self.units.push(unit);
    }

    /// Remove the highest-priority, earliest-submitted unit.
    pub fn pop(&mut self) -> Option<QueuedUnit<P>> {
        self.units.pop()
    }

    /// Peek at the unit `pop` would return.
    #[must_use]
    pub fn peek(&self) -> Option<&QueuedUnit<P>> {
        self.units.peek()
    }

    /// Number of pending units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no units are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl<P> Default for InMemoryQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}
