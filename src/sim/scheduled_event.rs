//! Queue ordering wrapper.
//!
//! `BinaryHeap` is a max-heap; we want earliest-time-first, so comparisons
//! are reversed. Ties break on creation order (`seq`), giving the queue its
//! deterministic FIFO-among-equal-timestamps behavior.

use super::event::Event;
use std::cmp::Ordering;

pub struct ScheduledEvent(pub Event);

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.0.timestamp.cmp(&other.0.timestamp) {
            Ordering::Equal => self.0.seq.cmp(&other.0.seq),
            ord => ord,
        }
        .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.0.timestamp == other.0.timestamp && self.0.seq == other.0.seq
    }
}

impl Eq for ScheduledEvent {}
