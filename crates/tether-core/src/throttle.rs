#![forbid(unsafe_code)]

//! Leading/trailing rate limiting for inbound events.
//!
//! A [`Throttle`] admits the first event immediately and then at most one
//! event per interval. Events arriving inside the window replace a single
//! pending slot; the pending event is released by [`Throttle::take_due`]
//! once the window has elapsed.
//!
//! # Invariants
//!
//! 1. A zero interval admits every event immediately.
//! 2. Accepted events are delivered in submission order; excess events are
//!    dropped, never reordered.
//! 3. At most one event is pending at any time, and it is the newest one
//!    seen inside the current window.

use std::time::Duration;
use web_time::Instant;

/// Outcome of offering an event to a [`Throttle`].
#[derive(Debug, PartialEq)]
pub enum Admission<E> {
    /// Deliver this event now.
    Deliver(E),
    /// The event is held as the trailing event of the current window.
    Deferred,
}

/// Per-listener rate limiter.
#[derive(Debug)]
pub struct Throttle<E> {
    interval: Duration,
    last_delivered: Option<Instant>,
    pending: Option<E>,
}

impl<E> Throttle<E> {
    /// Create a throttle with the given minimum interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_delivered: None,
            pending: None,
        }
    }

    /// Minimum interval between delivered events.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval. Takes effect for the next offered event.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Offer `event` at time `now`.
    pub fn offer(&mut self, event: E, now: Instant) -> Admission<E> {
        if self.interval.is_zero() || self.window_elapsed(now) {
            // A newer event supersedes whatever was still pending.
            self.pending = None;
            self.last_delivered = Some(now);
            return Admission::Deliver(event);
        }
        self.pending = Some(event);
        Admission::Deferred
    }

    /// Release the pending event if its window has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<E> {
        if self.pending.is_some() && self.window_elapsed(now) {
            self.last_delivered = Some(now);
            return self.pending.take();
        }
        None
    }

    /// Whether an event is waiting for its window to elapse.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn window_elapsed(&self, now: Instant) -> bool {
        self.last_delivered
            .is_none_or(|last| now.duration_since(last) >= self.interval)
    }
}
