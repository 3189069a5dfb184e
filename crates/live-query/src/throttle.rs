//! Leading plus trailing edge rate limiting.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

/// What to do with a value that just arrived.
pub(crate) enum Offer {
    /// The window is open: deliver immediately.
    Deliver(Value),
    /// Inside the window: the value is held as the trailing edge.
    Hold,
}

/// Tracks one delivery window at a time.
///
/// The first value of a quiet period goes out immediately and opens a
/// window of `min_interval`. Values arriving inside the window replace the
/// pending one, and a single deadline at the window's end flushes whatever
/// is freshest by then. A flush counts as a delivery, so the next window
/// starts at the deadline, not at the next arrival.
pub(crate) struct Throttle {
    min_interval: Duration,
    last_delivery: Option<Instant>,
    pending: Option<Value>,
    deadline: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Throttle {
            min_interval,
            last_delivery: None,
            pending: None,
            deadline: None,
        }
    }

    pub fn offer(&mut self, value: Value, now: Instant) -> Offer {
        match self.last_delivery {
            Some(last) if now < last + self.min_interval => {
                self.pending = Some(value);
                if self.deadline.is_none() {
                    self.deadline = Some(last + self.min_interval);
                }
                Offer::Hold
            }
            _ => {
                // An immediate delivery supersedes anything still pending.
                self.pending = None;
                self.mark_delivered(now);
                Offer::Deliver(value)
            }
        }
    }

    /// The armed trailing-edge deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Takes the pending value once its deadline fired.
    pub fn flush(&mut self, deadline: Instant) -> Option<Value> {
        self.mark_delivered(deadline);
        self.pending.take()
    }

    /// Takes whatever is still pending, deadline or not.
    pub fn take_pending(&mut self) -> Option<Value> {
        self.deadline = None;
        self.pending.take()
    }

    fn mark_delivered(&mut self, now: Instant) {
        self.last_delivery = Some(now);
        self.deadline = None;
    }
}
