//! Thread-safe event accumulator for parallel legalization stages.

use crate::event::Event;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A thread-safe accumulator for events emitted during legalization.
///
/// Multiple worker threads can emit events concurrently via
/// [`emit`](Self::emit). The error count is tracked atomically for fast
/// `has_errors` checks without locking the event vector.
pub struct EventSink {
    events: Mutex<Vec<Event>>,
    error_count: AtomicUsize,
}

impl EventSink {
    /// Creates a new empty event sink.
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    /// Emits an event into the sink.
    ///
    /// If the event has [`Severity::Error`], the error count is incremented atomically.
    pub fn emit(&self, event: Event) {
        if event.severity == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        let mut events = self.events.lock().unwrap();
        events.push(event);
    }

    /// Returns `true` if any error-severity events have been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Returns the number of error-severity events emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Takes all accumulated events, leaving the sink empty.
    ///
    /// The error count is not reset; it reflects the whole run.
    pub fn take_all(&self) -> Vec<Event> {
        let mut events = self.events.lock().unwrap();
        std::mem::take(&mut *events)
    }

    /// Returns a snapshot of all accumulated events without draining.
    pub fn events(&self) -> Vec<Event> {
        let events = self.events.lock().unwrap();
        events.clone()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Stage;

    #[test]
    fn empty_sink() {
        let sink = EventSink::new();
        assert!(!sink.has_errors());
        assert_eq!(sink.error_count(), 0);
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn emit_error() {
        let sink = EventSink::new();
        sink.emit(Event::error(Stage::Chain, "budget exhausted"));
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn emit_warning_not_error() {
        let sink = EventSink::new();
        sink.emit(Event::warning(Stage::Verify, "dense region"));
        assert!(!sink.has_errors());
        assert_eq!(sink.error_count(), 0);
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn take_all_drains() {
        let sink = EventSink::new();
        sink.emit(Event::error(Stage::Io, "e"));
        sink.emit(Event::note(Stage::Pipeline, "n"));
        let all = sink.take_all();
        assert_eq!(all.len(), 2);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn concurrent_emission() {
        use std::sync::Arc;

        let sink = Arc::new(EventSink::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let sink = Arc::clone(&sink);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    sink.emit(Event::error(Stage::SsrFlow, "x"));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.error_count(), 400);
        assert_eq!(sink.events().len(), 400);
    }
}
