use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum ReelEvent {
    Key(KeyEvent),
    /// Terminal focus gained (`true`) or lost (`false`)
    Focus(bool),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, focus, resize)
pub trait ReelEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<ReelEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<ReelEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                // Windows reports releases too; only presses drive the reel
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => ReelEvent::Key(key),
                Ok(CtEvent::FocusGained) => ReelEvent::Focus(true),
                Ok(CtEvent::FocusLost) => ReelEvent::Focus(false),
                Ok(CtEvent::Resize(_, _)) => ReelEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReelEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ReelEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<ReelEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<ReelEvent>) -> Self {
        Self { rx }
    }
}

impl ReelEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ReelEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: ReelEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: ReelEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks until the next event, the tick interval, or `due_in` (the wait until the
    /// next playback timer), whichever comes first. Returns Tick on timeout.
    pub fn step(&self, due_in: Option<Duration>) -> ReelEvent {
        let interval = self.ticker.interval();
        let timeout = due_in.map_or(interval, |d| d.min(interval));
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => ReelEvent::Tick,
        }
    }
}
