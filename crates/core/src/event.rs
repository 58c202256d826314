//! Device event model and the bounded delivery buffer.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::Time;

/// Default buffer capacity.
pub const DEFAULT_MAX_EVENTS: usize = 100;

/// One observed device event notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Resource uri that emitted the notification
    pub uri: String,

    /// Display name resolved from the resource registry, or the uri itself
    pub name: String,

    /// Monotonic capture time
    pub timestamp: Instant,

    /// Wall-clock capture time, for display only
    pub observed_at: Time,
}

impl Event {
    /// Capture a new event now.
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            timestamp: Instant::now(),
            observed_at: chrono::Utc::now(),
        }
    }
}

/// Bounded, ordered event store with a delivery cursor.
///
/// `delivered` counts the events at the front of the buffer that were
/// already handed out by [`EventBuffer::drain_new`]. Evicting a delivered
/// event moves the cursor back by one so it keeps covering the same logical
/// events. An undelivered event can be evicted before anyone reads it.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<Event>,
    delivered: usize,
    max_events: NonZeroUsize,
}

impl EventBuffer {
    /// Create a buffer holding at most `max_events` events.
    pub fn new(max_events: NonZeroUsize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.get().min(DEFAULT_MAX_EVENTS)),
            delivered: 0,
            max_events,
        }
    }

    /// Create a buffer from a plain capacity, clamping zero to one.
    pub fn with_capacity(max_events: usize) -> Self {
        Self::new(NonZeroUsize::new(max_events).unwrap_or(NonZeroUsize::MIN))
    }

    /// Append an event, evicting the oldest one when over capacity.
    pub fn add_event(&mut self, uri: impl Into<String>, name: impl Into<String>) {
        self.push(Event::new(uri, name));
    }

    /// Append an already captured event.
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
        if self.events.len() > self.max_events.get() {
            self.events.pop_front();
            self.delivered = self.delivered.saturating_sub(1);
        }
    }

    /// Return every event added since the previous drain and advance the cursor.
    pub fn drain_new(&mut self) -> Vec<Event> {
        let fresh: Vec<Event> = self.events.iter().skip(self.delivered).cloned().collect();
        self.delivered = self.events.len();
        fresh
    }

    /// Number of buffered events, delivered or not.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of buffered events already handed out.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Number of buffered events not yet handed out.
    pub fn pending(&self) -> usize {
        self.events.len() - self.delivered
    }

    /// Capacity of the buffer.
    pub fn max_events(&self) -> usize {
        self.max_events.get()
    }

    /// Snapshot of all buffered events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_EVENTS)
    }
}

/// Thread-safe handle to an [`EventBuffer`].
///
/// Notifications are dispatched on the transport's own task, which may run
/// on a different worker thread than the automation loop, so every access
/// goes through a mutex.
#[derive(Debug, Clone, Default)]
pub struct SharedEventBuffer {
    inner: Arc<Mutex<EventBuffer>>,
}

impl SharedEventBuffer {
    /// Wrap a buffer.
    pub fn new(buffer: EventBuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    /// Create a shared buffer with the given capacity.
    pub fn with_capacity(max_events: usize) -> Self {
        Self::new(EventBuffer::with_capacity(max_events))
    }

    /// See [`EventBuffer::add_event`].
    pub fn add_event(&self, uri: impl Into<String>, name: impl Into<String>) {
        let event = Event::new(uri, name);
        self.with(|buffer| buffer.push(event));
    }

    /// See [`EventBuffer::drain_new`].
    pub fn drain_new(&self) -> Vec<Event> {
        self.with(EventBuffer::drain_new)
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.with(|buffer| buffer.len())
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.with(|buffer| buffer.pending())
    }

    fn with<R>(&self, f: impl FnOnce(&mut EventBuffer) -> R) -> R {
        // Each critical section is a single push or drain, so a poisoned
        // lock still guards a consistent buffer.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_drain_returns_new_events_once() {
        let mut buffer = EventBuffer::default();
        buffer.add_event("wot://washer/events/cycleFinished", "cycleFinished");
        buffer.add_event("wot://doorbell/events/pressed", "pressed");

        let first = buffer.drain_new();
        assert_eq!(names(&first), vec!["cycleFinished", "pressed"]);
        assert!(buffer.drain_new().is_empty());
    }

    #[test]
    fn test_drain_only_returns_events_after_cursor() {
        let mut buffer = EventBuffer::default();
        buffer.add_event("a", "a");
        buffer.drain_new();
        buffer.add_event("b", "b");
        buffer.add_event("c", "c");

        assert_eq!(names(&buffer.drain_new()), vec!["b", "c"]);
    }

    #[test]
    fn test_overflow_without_drain_keeps_newest() {
        let mut buffer = EventBuffer::with_capacity(3);
        for name in ["a", "b", "c", "d"] {
            buffer.add_event(name, name);
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(names(&buffer.drain_new()), vec!["b", "c", "d"]);
        assert!(buffer.drain_new().is_empty());
    }

    #[test]
    fn test_eviction_of_delivered_event_does_not_underflow() {
        let mut buffer = EventBuffer::with_capacity(1);
        buffer.add_event("a", "a");
        assert_eq!(names(&buffer.drain_new()), vec!["a"]);

        buffer.add_event("b", "b");
        assert_eq!(buffer.delivered(), 0);
        assert_eq!(names(&buffer.drain_new()), vec!["b"]);
        assert!(buffer.drain_new().is_empty());
    }

    #[test]
    fn test_cursor_tracks_delivered_events_through_eviction() {
        let mut buffer = EventBuffer::with_capacity(3);
        buffer.add_event("a", "a");
        buffer.add_event("b", "b");
        buffer.drain_new();

        buffer.add_event("c", "c");
        buffer.add_event("d", "d");
        assert_eq!(buffer.delivered(), 1);
        assert_eq!(names(&buffer.drain_new()), vec!["c", "d"]);
    }

    #[test]
    fn test_invariants_hold_for_long_sequences() {
        let mut buffer = EventBuffer::with_capacity(5);
        for i in 0..200 {
            buffer.add_event(format!("uri-{i}"), format!("e{i}"));
            if i % 7 == 0 {
                buffer.drain_new();
            }
            assert!(buffer.len() <= 5);
            assert!(buffer.delivered() <= buffer.len());
        }
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = EventBuffer::with_capacity(0);
        buffer.add_event("a", "a");
        buffer.add_event("b", "b");
        assert_eq!(buffer.max_events(), 1);
        assert_eq!(names(&buffer.drain_new()), vec!["b"]);
    }

    #[tokio::test]
    async fn test_shared_buffer_across_tasks() {
        let shared = SharedEventBuffer::with_capacity(100);
        let writer = shared.clone();

        let handle = tokio::spawn(async move {
            for i in 0..10 {
                writer.add_event(format!("uri-{i}"), format!("e{i}"));
            }
        });
        handle.await.unwrap();

        assert_eq!(shared.pending(), 10);
        assert_eq!(shared.drain_new().len(), 10);
        assert_eq!(shared.pending(), 0);
        assert!(shared.drain_new().is_empty());
    }
}
