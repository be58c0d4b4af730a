//! Snippet rotation and the playback state machine.
//!
//! ```text
//! Idle --start--> Typing --complete--> Completed --hold elapsed--> Typing (next)
//!                   |  ^                   |
//!             pause |  | resume      pause |  ^ resume (fresh hold)
//!                   v  |                   v  |
//!             Paused(Typing)          Paused(Holding)
//!
//! any --sink failure--> Error --navigate--> Typing
//! ```

use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, TimerSlot};
use crate::engine::{TypingEngine, TypingEvent};
use crate::error::PlaybackError;
use crate::snippet::{Snippet, SnippetDeck};
use crate::sound::{Cue, SoundCue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    pub hold_after_complete: Duration,
    pub interaction_cooldown: Duration,
    pub auto_rotate: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            hold_after_complete: Duration::from_millis(5000),
            interaction_cooldown: Duration::from_millis(5000),
            auto_rotate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PausedFrom {
    Typing,
    Holding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Typing,
    Paused(PausedFrom),
    Completed,
    Error,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Typing => "typing",
            Phase::Paused(_) => "paused",
            Phase::Completed => "completed",
            Phase::Error => "error",
        }
    }
}

/// User requests the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Advance,
    Retreat,
    Jump(usize),
    TogglePause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    SnippetStarted { index: usize, id: String },
    PhaseChanged(Phase),
    Typing(TypingEvent),
}

/// Point-in-time view of the controller for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub index: usize,
    pub count: usize,
    pub title: String,
    pub language: String,
    pub phase: Phase,
    pub typed: usize,
    pub total: usize,
    pub interacting: bool,
    pub auto_rotate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HoldElapsed;

pub struct PlaybackController {
    deck: SnippetDeck,
    engine: TypingEngine,
    clock: Rc<dyn Clock>,
    sound: Rc<dyn SoundCue>,
    config: PlaybackConfig,
    current_index: usize,
    phase: Phase,
    hold: TimerSlot<HoldElapsed>,
    interacting_until: Option<Duration>,
    manual_pause: bool,
    unfocused: bool,
    /// Last cursor reported by the engine for the current snippet
    typed: usize,
    subscribers: Vec<Sender<PlaybackEvent>>,
}

impl PlaybackController {
    pub fn new(
        deck: SnippetDeck,
        engine: TypingEngine,
        clock: Rc<dyn Clock>,
        sound: Rc<dyn SoundCue>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            deck,
            engine,
            clock,
            sound,
            config,
            current_index: 0,
            phase: Phase::Idle,
            hold: TimerSlot::new(),
            interacting_until: None,
            manual_pause: false,
            unfocused: false,
            typed: 0,
            subscribers: Vec::new(),
        }
    }

    /// Begin playing from the current index (0 unless navigated before starting).
    pub fn start(&mut self) -> Result<(), PlaybackError> {
        if self.deck.is_empty() {
            return Err(PlaybackError::NoSnippets);
        }
        if self.phase != Phase::Idle {
            return Err(PlaybackError::AlreadyStarted);
        }

        info!(snippets = self.deck.len(), "playback starting");
        self.sound.play(Cue::Startup);
        let now = self.clock.now();
        self.play(self.current_index, now);
        Ok(())
    }

    pub fn next(&mut self) {
        let index = (self.current_index + 1) % self.deck.len();
        self.navigate(index);
    }

    pub fn previous(&mut self) {
        let count = self.deck.len();
        let index = (self.current_index + count - 1) % count;
        self.navigate(index);
    }

    /// Jump to `index`. Out-of-range requests are ignored.
    pub fn jump_to(&mut self, index: usize) {
        if index >= self.deck.len() {
            debug!(index, count = self.deck.len(), "ignoring out-of-range jump");
            return;
        }
        self.navigate(index);
    }

    /// Ignored before `start()` and in `Error`, where there is nothing to hold.
    pub fn pause(&mut self) {
        if matches!(self.phase, Phase::Idle | Phase::Error) {
            debug!(phase = self.phase.label(), "ignoring pause");
            return;
        }
        self.manual_pause = true;
        self.enter_pause();
    }

    pub fn resume(&mut self) {
        self.manual_pause = false;
        if !self.unfocused {
            self.leave_pause();
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.manual_pause {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Focus (visibility) changes pause and resume automatically, without
    /// overriding a pause the user asked for.
    pub fn set_focused(&mut self, focused: bool) {
        if self.unfocused != focused {
            return;
        }
        self.unfocused = !focused;
        debug!(focused, "focus changed");

        if self.unfocused {
            self.enter_pause();
        } else if !self.manual_pause {
            self.leave_pause();
        }
    }

    pub fn handle(&mut self, intent: Intent) {
        match intent {
            Intent::Advance => self.next(),
            Intent::Retreat => self.previous(),
            Intent::Jump(index) => self.jump_to(index),
            Intent::TogglePause => self.toggle_pause(),
        }
    }

    pub fn set_speed(&mut self, base_delay_ms: f64) {
        self.engine.set_speed(base_delay_ms);
    }

    pub fn base_delay_ms(&self) -> f64 {
        self.engine.config().base_delay_ms
    }

    /// Fire every timer due by the clock's current time.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        self.advance_to(now);
    }

    /// Fire every timer due by `now`, in deadline order, each at its own due time.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some(at) = self.next_deadline() {
            if at > now {
                break;
            }

            if self.engine.deadline() == Some(at) {
                self.engine.fire(at);
                self.drain_engine(at);
            } else if self.hold.take_due(at).is_some() {
                self.hold_elapsed(at);
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.engine.deadline(), self.hold.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_snippet(&self) -> Option<&Snippet> {
        self.deck.get(self.current_index)
    }

    pub fn deck(&self) -> &SnippetDeck {
        &self.deck
    }

    pub fn engine(&self) -> &TypingEngine {
        &self.engine
    }

    pub fn is_user_interacting(&self) -> bool {
        self.interacting_at(self.clock.now())
    }

    /// Number of timers currently outstanding (engine step plus hold).
    pub fn pending_timers(&self) -> usize {
        usize::from(self.engine.deadline().is_some()) + usize::from(self.hold.is_pending())
    }

    pub fn status(&self) -> PlaybackStatus {
        let snippet = self.current_snippet();
        let total = snippet.map_or(0, |s| s.code.chars().count());
        let typed = match (self.engine.session(), self.phase) {
            (Some(session), _) => session.cursor(),
            (None, Phase::Completed | Phase::Paused(PausedFrom::Holding)) => total,
            (None, Phase::Error) => self.typed,
            _ => 0,
        };

        PlaybackStatus {
            index: self.current_index,
            count: self.deck.len(),
            title: snippet.map(|s| s.title.clone()).unwrap_or_default(),
            language: snippet.map(|s| s.language.clone()).unwrap_or_default(),
            phase: self.phase,
            typed,
            total,
            interacting: self.is_user_interacting(),
            auto_rotate: self.config.auto_rotate,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn interacting_at(&self, now: Duration) -> bool {
        self.interacting_until.is_some_and(|until| now < until)
    }

    /// Manual navigation: cancel everything, mark the cooldown and restart typing
    /// on `index` in a single synchronous step.
    fn navigate(&mut self, index: usize) {
        let now = self.clock.now();
        self.interacting_until = Some(now + self.config.interaction_cooldown);
        self.manual_pause = false;
        debug!(from = self.current_index, to = index, "manual navigation");
        self.play(index, now);
    }

    fn play(&mut self, index: usize, now: Duration) {
        self.hold.cancel();
        self.engine.stop();
        // The abandoned snippet's Cancelled goes out before the next SnippetStarted
        self.drain_engine(now);
        self.current_index = index;
        self.typed = 0;

        let Some(snippet) = self.deck.get(index) else {
            return;
        };
        let id = snippet.id.clone();
        let result = self.engine.run(&snippet.code, &snippet.language, now);
        self.broadcast(PlaybackEvent::SnippetStarted { index, id });

        match result {
            Ok(()) => {
                self.set_phase(Phase::Typing);
                self.drain_engine(now);
                if self.unfocused {
                    self.enter_pause();
                }
            }
            Err(err) => {
                error!(index, %err, "failed to start snippet");
                self.set_phase(Phase::Error);
            }
        }
    }

    fn drain_engine(&mut self, at: Duration) {
        for event in self.engine.take_events() {
            match &event {
                TypingEvent::Complete => self.snippet_complete(at),
                TypingEvent::Error { reason } => {
                    error!(index = self.current_index, reason, "typing failed");
                    self.hold.cancel();
                    self.set_phase(Phase::Error);
                }
                TypingEvent::Progress { cursor, .. } => self.typed = *cursor,
                TypingEvent::Cancelled => {}
            }
            self.broadcast(PlaybackEvent::Typing(event));
        }
    }

    fn snippet_complete(&mut self, at: Duration) {
        self.set_phase(Phase::Completed);
        if self.config.auto_rotate {
            self.hold
                .schedule(at + self.config.hold_after_complete, HoldElapsed);
        }
    }

    fn hold_elapsed(&mut self, at: Duration) {
        if self.phase != Phase::Completed {
            return;
        }

        if let Some(until) = self.interacting_until.filter(|_| self.interacting_at(at)) {
            debug!("user interacting, postponing rotation");
            self.hold.schedule(until, HoldElapsed);
            return;
        }

        let index = (self.current_index + 1) % self.deck.len();
        debug!(to = index, "auto-rotating");
        self.play(index, at);
    }

    fn enter_pause(&mut self) {
        match self.phase {
            Phase::Typing => {
                self.engine.pause();
                self.set_phase(Phase::Paused(PausedFrom::Typing));
            }
            Phase::Completed => {
                self.hold.cancel();
                self.set_phase(Phase::Paused(PausedFrom::Holding));
            }
            Phase::Idle | Phase::Paused(_) | Phase::Error => {}
        }
    }

    fn leave_pause(&mut self) {
        let now = self.clock.now();
        match self.phase {
            Phase::Paused(PausedFrom::Typing) => {
                self.engine.resume(now);
                self.set_phase(Phase::Typing);
            }
            Phase::Paused(PausedFrom::Holding) => {
                if self.config.auto_rotate {
                    self.hold
                        .schedule(now + self.config.hold_after_complete, HoldElapsed);
                }
                self.set_phase(Phase::Completed);
            }
            Phase::Idle | Phase::Typing | Phase::Completed | Phase::Error => {}
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        if phase == Phase::Error {
            warn!(index = self.current_index, "playback halted until next navigation");
        }
        debug!(from = self.phase.label(), to = phase.label(), "phase change");
        self.phase = phase;
        self.broadcast(PlaybackEvent::PhaseChanged(phase));
    }

    fn broadcast(&mut self, event: PlaybackEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
