//! Character-by-character typing engine.
//!
//! The engine owns at most one [`TypingSession`] and at most one pending timer.
//! It never reads the wall clock: callers pass `now` when starting or resuming,
//! and timers are fired with their own due time via [`TypingEngine::fire`], which
//! keeps a fake clock and a real one indistinguishable.

use rand::RngCore;
use std::mem;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::clock::TimerSlot;
use crate::error::{EngineError, SinkError};
use crate::sink::OutputSink;
use crate::sound::{Cue, SoundCue};
use crate::typing_policy::{wrong_char, TypingConfig, CORRECTION_RETYPE_DELAY};

/// Notifications about the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingEvent {
    Progress { cursor: usize, total: usize },
    Complete,
    /// The session was stopped before it finished. Not a completion.
    Cancelled,
    Error { reason: String },
}

/// Floor for the base per-character delay.
pub const MIN_BASE_DELAY_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Type the character under the cursor (possibly mistyping it first)
    Type,
    /// Backspace over a wrong character
    Retract,
    /// Type the correct character after a retraction
    Retype,
}

/// State of one `run` over one text.
#[derive(Debug, Clone)]
pub struct TypingSession {
    source: Vec<char>,
    cursor: usize,
    rendered: String,
    paused: bool,
    resume_step: Step,
}

impl TypingSession {
    fn new(text: &str) -> Self {
        Self {
            source: text.chars().collect(),
            cursor: 0,
            rendered: String::with_capacity(text.len()),
            paused: false,
            resume_step: Step::Type,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.source.len()
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.cursor).copied()
    }
}

pub struct TypingEngine {
    config: TypingConfig,
    sink: Box<dyn OutputSink>,
    sound: Rc<dyn SoundCue>,
    rng: Box<dyn RngCore>,
    session: Option<TypingSession>,
    timer: TimerSlot<Step>,
    outbox: Vec<TypingEvent>,
    subscribers: Vec<Sender<TypingEvent>>,
}

impl TypingEngine {
    pub fn new<S, R>(mut config: TypingConfig, sink: S, sound: Rc<dyn SoundCue>, rng: R) -> Self
    where
        S: OutputSink + 'static,
        R: RngCore + 'static,
    {
        config.base_delay_ms = config.base_delay_ms.max(MIN_BASE_DELAY_MS);
        Self {
            config,
            sink: Box::new(sink),
            sound,
            rng: Box::new(rng),
            session: None,
            timer: TimerSlot::new(),
            outbox: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Start typing `text` into the sink.
    ///
    /// Fails without touching the current session if one is already active.
    /// Empty text completes on the spot.
    pub fn run(&mut self, text: &str, language: &str, now: Duration) -> Result<(), EngineError> {
        if self.session.is_some() {
            warn!("run requested while a typing session is active");
            return Err(EngineError::SessionActive);
        }

        self.timer.cancel();
        self.sink.set_text("")?;
        self.sink.set_language_tag(language)?;

        let session = TypingSession::new(text);
        debug!(chars = session.total(), language, "typing session started");
        let empty = session.total() == 0;
        self.session = Some(session);

        if empty {
            self.finish();
        } else {
            self.timer.schedule(now, Step::Type);
        }
        Ok(())
    }

    /// Run the pending step if it is due at `now`.
    pub fn fire(&mut self, now: Duration) {
        let Some((at, step)) = self.timer.take_due(now) else {
            return;
        };

        let outcome = match step {
            Step::Type => self.type_next(at),
            Step::Retract => self.retract(at),
            Step::Retype => self.retype(at),
        };
        if let Err(err) = outcome {
            self.fail(err);
        }
    }

    pub fn pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.paused {
            return;
        }

        session.paused = true;
        session.resume_step = self.timer.cancel().unwrap_or(Step::Type);
        debug!(cursor = session.cursor, "typing paused");
    }

    /// Continue from the exact cursor with a fresh delay.
    pub fn resume(&mut self, now: Duration) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.paused {
            return;
        }

        session.paused = false;
        let step = session.resume_step;
        let delay = match step {
            Step::Type => session
                .current()
                .map(|c| self.config.char_delay(c, self.rng.as_mut()))
                .unwrap_or_default(),
            Step::Retract => self.config.error_correct_delay(),
            Step::Retype => CORRECTION_RETYPE_DELAY,
        };
        debug!(cursor = session.cursor, "typing resumed");
        self.timer.schedule(now + delay, step);
    }

    /// Abandon the session. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        self.timer.cancel();
        if let Some(session) = self.session.take() {
            debug!(
                cursor = session.cursor,
                total = session.total(),
                "typing session stopped"
            );
            self.emit(TypingEvent::Cancelled);
        }
    }

    /// Change the base per-character delay for everything scheduled from now on.
    pub fn set_speed(&mut self, base_delay_ms: f64) {
        self.config.base_delay_ms = base_delay_ms.max(MIN_BASE_DELAY_MS);
    }

    pub fn config(&self) -> &TypingConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.paused)
    }

    pub fn session(&self) -> Option<&TypingSession> {
        self.session.as_ref()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timer.deadline()
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<TypingEvent> {
        mem::take(&mut self.outbox)
    }

    pub fn subscribe(&mut self) -> Receiver<TypingEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn type_next(&mut self, at: Duration) -> Result<(), SinkError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let Some(c) = session.current() else {
            self.finish();
            return Ok(());
        };

        if self.config.should_mistype(c, self.rng.as_mut()) {
            let wrong = wrong_char(c, self.rng.as_mut());
            session.rendered.push(wrong);
            self.sink.set_text(&session.rendered)?;
            self.sound.play(Cue::Keypress);
            self.timer
                .schedule(at + self.config.error_correct_delay(), Step::Retract);
            return Ok(());
        }

        let delay = self.config.char_delay(c, self.rng.as_mut());
        session.rendered.push(c);
        session.cursor += 1;
        self.sink.set_text(&session.rendered)?;
        self.sound
            .play(if c == '\n' { Cue::Enter } else { Cue::Keypress });
        self.advance(at + delay);
        Ok(())
    }

    fn retract(&mut self, at: Duration) -> Result<(), SinkError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        session.rendered.pop();
        self.sink.set_text(&session.rendered)?;
        self.sound.play(Cue::Backspace);
        self.timer.schedule(at + CORRECTION_RETYPE_DELAY, Step::Retype);
        Ok(())
    }

    fn retype(&mut self, at: Duration) -> Result<(), SinkError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let Some(c) = session.current() else {
            self.finish();
            return Ok(());
        };

        session.rendered.push(c);
        session.cursor += 1;
        self.sink.set_text(&session.rendered)?;
        self.sound.play(Cue::Keypress);
        let delay = self.config.char_delay(c, self.rng.as_mut());
        self.advance(at + delay);
        Ok(())
    }

    /// Report progress, then either finish or queue the next character.
    fn advance(&mut self, next_at: Duration) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let (cursor, total) = (session.cursor, session.total());

        self.emit(TypingEvent::Progress { cursor, total });
        if cursor >= total {
            self.finish();
        } else {
            self.timer.schedule(next_at, Step::Type);
        }
    }

    fn finish(&mut self) {
        self.timer.cancel();
        if let Some(session) = self.session.take() {
            debug!(chars = session.total(), "typing session complete");
            self.sound.play(Cue::Complete);
            self.emit(TypingEvent::Complete);
        }
    }

    fn fail(&mut self, err: SinkError) {
        self.timer.cancel();
        if let Some(session) = self.session.take() {
            error!(cursor = session.cursor, %err, "typing session failed");
            self.emit(TypingEvent::Error {
                reason: err.to_string(),
            });
        }
    }

    fn emit(&mut self, event: TypingEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        self.outbox.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SharedScreen;
    use crate::sound::CueRecorder;
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(base_delay_ms: f64, error_chance: f64) -> TypingConfig {
        TypingConfig {
            base_delay_ms,
            speed_variation_ms: 0.0,
            pause_chance: 0.0,
            pause_duration_ms: 200.0,
            error_chance,
            error_correct_delay_ms: 500.0,
        }
    }

    fn engine(cfg: TypingConfig, seed: u64) -> (TypingEngine, SharedScreen, Rc<CueRecorder>) {
        let screen = SharedScreen::new();
        let sound = Rc::new(CueRecorder::new());
        let engine = TypingEngine::new(
            cfg,
            screen.clone(),
            sound.clone(),
            StdRng::seed_from_u64(seed),
        );
        (engine, screen, sound)
    }

    /// Fire every timer in order until the engine goes quiet.
    fn run_out(engine: &mut TypingEngine) {
        while let Some(at) = engine.deadline() {
            engine.fire(at);
        }
    }

    struct BrokenSink {
        writes_before_failure: usize,
    }

    impl OutputSink for BrokenSink {
        fn set_text(&mut self, _text: &str) -> Result<(), SinkError> {
            if self.writes_before_failure == 0 {
                return Err(SinkError("display detached".into()));
            }
            self.writes_before_failure -= 1;
            Ok(())
        }

        fn set_language_tag(&mut self, _tag: &str) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn renders_full_text_and_sets_language() {
        let (mut engine, screen, sound) = engine(config(10.0, 0.0), 1);
        engine.run("fn x() {}\n", "rust", Duration::ZERO).unwrap();
        run_out(&mut engine);

        assert_eq!(screen.text(), "fn x() {}\n");
        assert_eq!(screen.language(), "rust");
        assert!(!engine.is_active());
        assert_eq!(sound.count(Cue::Enter), 1);
        assert_eq!(sound.count(Cue::Complete), 1);
        assert_eq!(engine.take_events().last(), Some(&TypingEvent::Complete));
    }

    #[test]
    fn corrections_net_to_source_text() {
        let text = "let answer = 42;\nprintln!(\"{answer}\");\n";
        for seed in 0..20 {
            let (mut engine, screen, sound) = engine(config(20.0, 0.3), seed);
            engine.run(text, "rust", Duration::ZERO).unwrap();
            run_out(&mut engine);
            assert_eq!(screen.text(), text, "seed {seed}");
            assert_eq!(sound.count(Cue::Complete), 1);
        }
    }

    #[test]
    fn forced_mistake_on_single_char_recovers() {
        let (mut engine, screen, sound) = engine(config(10.0, 1.0), 5);
        engine.run("x", "text", Duration::ZERO).unwrap();

        engine.fire(Duration::ZERO);
        let shown = screen.text();
        assert_eq!(shown.chars().count(), 1);
        assert_ne!(shown, "x");

        engine.fire(Duration::from_millis(500));
        assert_eq!(screen.text(), "");
        engine.fire(Duration::from_millis(600));
        assert_eq!(screen.text(), "x");
        assert!(!engine.is_active());
        assert_eq!(
            sound.cues(),
            vec![Cue::Keypress, Cue::Backspace, Cue::Keypress, Cue::Complete]
        );
    }

    #[test]
    fn empty_text_completes_immediately() {
        let (mut engine, screen, sound) = engine(config(10.0, 0.0), 1);
        engine.run("", "text", Duration::ZERO).unwrap();

        assert!(!engine.is_active());
        assert_eq!(engine.deadline(), None);
        assert_eq!(screen.text(), "");
        assert_eq!(sound.cues(), vec![Cue::Complete]);
        assert_eq!(engine.take_events(), vec![TypingEvent::Complete]);
    }

    #[test]
    fn run_while_active_is_rejected_without_side_effects() {
        let (mut engine, screen, _) = engine(config(10.0, 0.0), 1);
        engine.run("abc", "text", Duration::ZERO).unwrap();
        engine.fire(Duration::ZERO);
        let deadline = engine.deadline();

        assert_matches!(
            engine.run("zzz", "other", Duration::ZERO),
            Err(EngineError::SessionActive)
        );
        assert_eq!(screen.text(), "a");
        assert_eq!(screen.language(), "text");
        assert_eq!(engine.deadline(), deadline);
        assert_eq!(engine.session().map(|s| s.cursor()), Some(1));
    }

    #[test]
    fn stop_is_idempotent_and_never_completes() {
        let (mut engine, _, sound) = engine(config(10.0, 0.0), 1);
        engine.stop();
        engine.run("abc", "text", Duration::ZERO).unwrap();
        engine.fire(Duration::ZERO);
        engine.stop();
        engine.stop();

        assert!(!engine.is_active());
        assert_eq!(engine.deadline(), None);
        assert_eq!(sound.count(Cue::Complete), 0);
        let events = engine.take_events();
        assert_eq!(events.last(), Some(&TypingEvent::Cancelled));
        assert!(!events.contains(&TypingEvent::Complete));

        engine.run("again", "text", Duration::from_secs(1)).unwrap();
        assert!(engine.is_active());
    }

    #[test]
    fn pause_preserves_cursor_and_resume_continues() {
        let (mut engine, screen, _) = engine(config(100.0, 0.0), 1);
        engine.run("hello", "text", Duration::ZERO).unwrap();
        engine.fire(Duration::ZERO);
        engine.fire(Duration::from_millis(100));
        assert_eq!(screen.text(), "he");

        engine.pause();
        engine.pause();
        assert!(engine.is_paused());
        assert_eq!(engine.deadline(), None);
        engine.fire(Duration::from_secs(10));
        assert_eq!(screen.text(), "he");

        engine.resume(Duration::from_secs(10));
        assert_eq!(engine.deadline(), Some(Duration::from_millis(10_100)));
        run_out(&mut engine);
        assert_eq!(screen.text(), "hello");
    }

    #[test]
    fn pause_during_mistake_keeps_wrong_char_until_resume() {
        let (mut engine, screen, _) = engine(config(10.0, 1.0), 2);
        engine.run("ab", "text", Duration::ZERO).unwrap();
        engine.fire(Duration::ZERO);
        let with_typo = screen.text();
        assert_ne!(with_typo, "a");

        engine.pause();
        assert_eq!(screen.text(), with_typo);

        engine.resume(Duration::from_secs(3));
        assert_eq!(
            engine.deadline(),
            Some(Duration::from_secs(3) + Duration::from_millis(500))
        );
        run_out(&mut engine);
        assert_eq!(screen.text(), "ab");
    }

    #[test]
    fn resume_and_pause_are_noops_without_session() {
        let (mut engine, _, _) = engine(config(10.0, 0.0), 1);
        engine.pause();
        engine.resume(Duration::ZERO);
        assert!(!engine.is_paused());
        assert_eq!(engine.deadline(), None);
    }

    #[test]
    fn set_speed_applies_to_next_schedule() {
        let (mut engine, _, _) = engine(config(100.0, 0.0), 1);
        engine.run("abc", "text", Duration::ZERO).unwrap();
        engine.fire(Duration::ZERO);
        assert_eq!(engine.deadline(), Some(Duration::from_millis(100)));

        engine.set_speed(40.0);
        assert_eq!(engine.deadline(), Some(Duration::from_millis(100)));
        engine.fire(Duration::from_millis(100));
        assert_eq!(engine.deadline(), Some(Duration::from_millis(140)));

        engine.set_speed(0.0);
        assert_eq!(engine.config().base_delay_ms, 1.0);
    }

    #[test]
    fn zero_base_delay_is_raised_to_floor() {
        let (mut engine, screen, _) = engine(config(0.0, 0.0), 1);
        assert_eq!(engine.config().base_delay_ms, MIN_BASE_DELAY_MS);

        engine.run("ab", "text", Duration::ZERO).unwrap();
        engine.fire(Duration::ZERO);
        assert_eq!(screen.text(), "a");
        assert_eq!(engine.deadline(), Some(Duration::from_millis(1)));
    }

    #[test]
    fn sink_failure_ends_session_with_error() {
        let sound = Rc::new(CueRecorder::new());
        let mut engine = TypingEngine::new(
            config(10.0, 0.0),
            BrokenSink {
                writes_before_failure: 2,
            },
            sound.clone(),
            StdRng::seed_from_u64(1),
        );
        engine.run("abcdef", "text", Duration::ZERO).unwrap();
        run_out(&mut engine);

        assert!(!engine.is_active());
        assert_eq!(sound.count(Cue::Complete), 0);
        assert_matches!(
            engine.take_events().last(),
            Some(TypingEvent::Error { reason }) if reason.contains("display detached")
        );
    }

    #[test]
    fn subscribers_receive_events() {
        let (mut engine, _, _) = engine(config(10.0, 0.0), 1);
        let rx = engine.subscribe();
        engine.run("ok", "text", Duration::ZERO).unwrap();
        run_out(&mut engine);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                TypingEvent::Progress { cursor: 1, total: 2 },
                TypingEvent::Progress { cursor: 2, total: 2 },
                TypingEvent::Complete,
            ]
        );
    }
}
