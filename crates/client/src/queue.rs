//! In-memory event queue.

use parking_lot::Mutex;
use tracker_core::TrackEvent;

/// Ordered queue of tracked events awaiting flush.
///
/// Threshold checks and snapshots happen under the same lock as appends, so
/// two concurrent `push` calls can never both claim the same batch.
#[derive(Debug)]
pub struct EventQueue {
    max_size: usize,
    events: Mutex<Vec<TrackEvent>>,
}

impl EventQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            events: Mutex::new(Vec::with_capacity(max_size)),
        }
    }

    /// Appends an event.
    /// Returns the whole queue, leaving it empty, once it reaches `max_size`.
    pub fn push(&self, event: TrackEvent) -> Option<Vec<TrackEvent>> {
        let mut events = self.events.lock();
        events.push(event);

        if events.len() >= self.max_size {
            return Some(std::mem::replace(
                &mut *events,
                Vec::with_capacity(self.max_size),
            ));
        }

        None
    }

    /// Takes every queued event and resets the queue.
    pub fn take(&self) -> Vec<TrackEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
