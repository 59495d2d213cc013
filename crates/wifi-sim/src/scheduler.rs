//! Deterministic event queue
//!
//! Events fire in time order; events due at the same instant fire in the
//! order they were queued. This keeps same-time arrivals reproducible, which
//! matters because the first PPDU to arrive wins synchronization.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use wifi_spectrum::{NodeId, PhyTimer, Scheduler};

struct Entry<T> {
    at: Duration,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

/// Simulation clock plus pending events
pub struct EventQueue<T> {
    now: Duration,
    seq: u64,
    heap: BinaryHeap<Entry<T>>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            seq: 0,
            heap: BinaryHeap::new(),
        }
    }

    /// Current simulation time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Queue `item` at absolute time `at`; times in the past fire now
    pub fn push(&mut self, at: Duration, item: T) {
        let at = at.max(self.now);
        self.heap.push(Entry {
            at,
            seq: self.seq,
            item,
        });
        self.seq += 1;
    }

    /// Queue `item` after `delay`
    pub fn push_after(&mut self, delay: Duration, item: T) {
        self.push(self.now + delay, item);
    }

    /// Take the next event and advance the clock to it
    pub fn pop(&mut self) -> Option<(Duration, T)> {
        let entry = self.heap.pop()?;
        self.now = entry.at;
        Some((entry.at, entry.item))
    }

    /// Time of the next event
    pub fn peek_time(&self) -> Option<Duration> {
        self.heap.peek().map(|e| e.at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// A PHY timer due for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTimer {
    pub node: NodeId,
    pub timer: PhyTimer,
}

/// Scheduler handed to one node's PHY
///
/// Timers land in the shared queue tagged with the node they belong to.
pub struct NodeScheduler<'a, T> {
    node: NodeId,
    queue: &'a mut EventQueue<T>,
}

impl<'a, T> NodeScheduler<'a, T> {
    pub fn new(node: NodeId, queue: &'a mut EventQueue<T>) -> Self {
        Self { node, queue }
    }
}

impl<T: From<NodeTimer>> Scheduler for NodeScheduler<'_, T> {
    fn now(&self) -> Duration {
        self.queue.now()
    }

    fn schedule(&mut self, delay: Duration, timer: PhyTimer) {
        let node = self.node;
        self.queue.push_after(delay, T::from(NodeTimer { node, timer }));
    }
}
