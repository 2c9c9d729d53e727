use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Clone, Debug, PartialEq)]
pub struct Patient {
    pub id: usize,
    pub arrival_time: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Arrival(Patient),
    Departure { server_id: usize, patient_id: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledEvent {
    pub time: f64,
    pub seq: u64,
    pub event: Event,
}

impl Eq for ScheduledEvent {}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.event.priority().cmp(&other.event.priority()))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Event {
    /// Departures free a server before a simultaneous arrival looks for one.
    fn priority(&self) -> u8 {
        match self {
            Event::Departure { .. } => 0,
            Event::Arrival(_) => 1,
        }
    }
}

/// Min-heap of pending events plus the current simulation time.
///
/// Time never moves backwards: `pop` advances the clock to the popped event,
/// and scheduling into the past is clamped to `now`.
#[derive(Debug, Default)]
pub struct EventQueue {
    now: f64,
    next_seq: u64,
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn schedule(&mut self, time: f64, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledEvent {
            time: time.max(self.now),
            seq,
            event,
        }));
    }

    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        let Reverse(scheduled) = self.heap.pop()?;
        self.now = scheduled.time;
        Some(scheduled)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
