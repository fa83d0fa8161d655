//! Single-threaded timer queue.
//!
//! Events are scheduled at a relative delay from the scheduler's notion of
//! "now" and handed back one at a time by [`Scheduler::pop_due`]. The driver
//! owns the clock: the live event loop advances `now` from a monotonic
//! instant, tests step a virtual timeline. Handlers run to completion between
//! pops, so nothing here needs a lock.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

struct Entry<T> {
    deadline: Duration,
    seq: u64,
    event: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap yields the earliest deadline, FIFO among equals.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of `(deadline, event)` pairs drained by one loop.
pub struct Scheduler<T> {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Current time on the scheduler's timeline.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward. Time never runs backwards.
    pub fn set_now(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Schedule `event` to fire no earlier than `delay` from now.
    pub fn schedule(&mut self, delay: Duration, event: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry {
            deadline: self.now + delay,
            seq,
            event,
        });
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.peek().map(|entry| entry.deadline)
    }

    /// Pop the earliest event whose deadline has passed.
    pub fn pop_due(&mut self) -> Option<T> {
        match self.queue.peek() {
            Some(entry) if entry.deadline <= self.now => self.queue.pop().map(|e| e.event),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
