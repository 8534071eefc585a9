//! Coalesces rapid input into a single value applied once input settles.
//!
//! Allocating on every keystroke breaks multi-digit entry when only large
//! packs are in stock: typing "100" would round the leading "1" up to a full
//! pack before the user finishes. The debouncer keeps only the latest value
//! and releases it after `delay` without further input.
//!
//! The caller supplies the clock, so the debouncer itself never sleeps.

use std::time::{Duration, Instant};

/// Last-write-wins input buffer.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Queue a value, replacing any pending one and restarting the delay.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Release the pending value if the delay has elapsed since the last
    /// push.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let settled = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.delay);
        if settled {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Release the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
