use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of "now", measured from an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Monotonic wall clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for tests and headless runs.
///
/// Clones share the same time, so a test can keep one handle and give another
/// to the controller.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// A single pending timer.
///
/// Scheduling always replaces whatever was pending, so an owner can never end up
/// with two outstanding callbacks.
#[derive(Debug, Clone)]
pub struct TimerSlot<K> {
    pending: Option<(Duration, K)>,
}

impl<K> TimerSlot<K> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    pub fn schedule(&mut self, at: Duration, kind: K) {
        self.pending = Some((at, kind));
    }

    /// Cancel the pending timer, if any. Safe to call on an empty slot.
    pub fn cancel(&mut self) -> Option<K> {
        self.pending.take().map(|(_, kind)| kind)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Pop the timer if it is due at `now`, returning its due time and kind.
    pub fn take_due(&mut self, now: Duration) -> Option<(Duration, K)> {
        match self.pending {
            Some((at, _)) if at <= now => self.pending.take(),
            _ => None,
        }
    }
}

impl<K> Default for TimerSlot<K> {
    fn default() -> Self {
        Self::new()
    }
}
