use std::time::{Duration, Instant};

/// Holds the latest scheduled item until a quiet period has passed.
///
/// The clock is passed in, so callers (and tests) decide what "now" is.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedules `item`, returning the item it supersedes.
    pub fn schedule(&mut self, item: T, now: Instant) -> Option<T> {
        self.pending
            .replace((now + self.delay, item))
            .map(|(_, superseded)| superseded)
    }

    /// Releases the pending item once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, item)| item),
            _ => None,
        }
    }

    /// Drops the pending item. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Releases the pending item without waiting for its deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, item)| item)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }
}
