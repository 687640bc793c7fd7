//! FIFO-with-delay trigger queue.
//!
//! Mirrors the source's `EventQueue` (a `Queue`/`PriorityQueue` wrapper around
//! `TriggerData` records): `put` is non-blocking, `pop` is non-blocking and
//! fails-fast when empty, and `remove` drops everything matching a `send_id` for
//! cancellation. A record whose `due` time hasn't arrived yet is the caller's
//! responsibility to re-`put` (see `Engine::drain_external`), so the queue itself
//! stays a plain FIFO rather than a real time-ordered priority queue — that's also
//! how the source behaves despite the `PriorityQueue` import, since `TriggerData`
//! never defines an ordering key.

use std::collections::VecDeque;
use std::time::Instant;

use crate::payload::Payload;

/// A single occurrence of an event, queued for processing.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub event: String,
    pub payload: Payload,
    pub send_id: Option<String>,
    pub due: Instant,
    pub internal: bool,
}

impl Trigger {
    pub fn immediate(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            payload: Payload::new(),
            send_id: None,
            due: Instant::now(),
            internal: false,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_send_id(mut self, send_id: impl Into<String>) -> Self {
        self.send_id = Some(send_id.into());
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.due = Instant::now() + delay;
        self
    }

    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    pub fn is_due(&self) -> bool {
        Instant::now() >= self.due
    }
}

/// Non-blocking FIFO queue of [`Trigger`] records.
#[derive(Debug, Default)]
pub struct PriorityEventQueue {
    items: VecDeque<Trigger>,
}

impl PriorityEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Enqueue without blocking. External callers (other threads) may call this
    /// concurrently with a processing loop; callers are expected to serialize
    /// access with their own lock (see `Engine`), matching the source's reliance
    /// on the GIL plus an explicit mutex for `remove`.
    pub fn put(&mut self, trigger: Trigger) {
        self.items.push_back(trigger);
    }

    /// Pop the oldest record, or `None` if the queue is empty.
    pub fn pop(&mut self) -> Option<Trigger> {
        self.items.pop_front()
    }

    /// The oldest record without removing it.
    pub fn peek(&self) -> Option<&Trigger> {
        self.items.front()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn remove_by_send_id(&mut self, send_id: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|t| t.send_id.as_deref() != Some(send_id));
        before - self.items.len()
    }
}
