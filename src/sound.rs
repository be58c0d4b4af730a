use std::cell::{Cell, RefCell};
use std::io::{self, Write};

/// Feedback cues emitted while typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Cue {
    Keypress,
    Backspace,
    Enter,
    Complete,
    Startup,
}

/// Fire-and-forget cue player. Implementations must not panic or block.
pub trait SoundCue {
    fn play(&self, cue: Cue);
}

/// Plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl SoundCue for Silent {
    fn play(&self, _cue: Cue) {}
}

/// Rings the terminal bell on startup and when a snippet finishes.
/// Other cues are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl SoundCue for TerminalBell {
    fn play(&self, cue: Cue) {
        if matches!(cue, Cue::Startup | Cue::Complete) {
            let mut out = io::stdout();
            let _ = out.write_all(b"\x07").and_then(|_| out.flush());
        }
    }
}

/// Keeps every cue it is asked to play, for headless runs and tests.
#[derive(Debug, Default)]
pub struct CueRecorder {
    cues: RefCell<Vec<Cue>>,
}

impl CueRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues.borrow().clone()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.cues.borrow().iter().filter(|c| **c == cue).count()
    }

    pub fn clear(&self) {
        self.cues.borrow_mut().clear();
    }
}

impl SoundCue for CueRecorder {
    fn play(&self, cue: Cue) {
        self.cues.borrow_mut().push(cue);
    }
}

/// Wraps another cue player behind a runtime on/off switch.
#[derive(Debug, Default)]
pub struct Switchable<S> {
    inner: S,
    enabled: Cell<bool>,
}

impl<S: SoundCue> Switchable<S> {
    pub fn new(inner: S, enabled: bool) -> Self {
        Self {
            inner,
            enabled: Cell::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Flip the switch and return the new state.
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled.get();
        self.enabled.set(enabled);
        enabled
    }
}

impl<S: SoundCue> SoundCue for Switchable<S> {
    fn play(&self, cue: Cue) {
        if self.enabled.get() {
            self.inner.play(cue);
        }
    }
}
