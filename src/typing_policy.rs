//! Timing and mistake policy for simulated typing.
//!
//! Every decision draws from the injected random source so a seeded rng gives a
//! reproducible run.

use rand::{Rng, RngCore};
use std::time::Duration;

/// Pause between retracting a wrong character and typing the right one.
pub const CORRECTION_RETYPE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct TypingConfig {
    pub base_delay_ms: f64,
    pub speed_variation_ms: f64,
    pub pause_chance: f64,
    pub pause_duration_ms: f64,
    pub error_chance: f64,
    pub error_correct_delay_ms: f64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 50.0,
            speed_variation_ms: 20.0,
            pause_chance: 0.1,
            pause_duration_ms: 200.0,
            error_chance: 0.02,
            error_correct_delay_ms: 500.0,
        }
    }
}

/// Delay multiplier by character class.
pub fn class_factor(c: char) -> f64 {
    match c {
        '\n' => 2.0,
        ' ' => 1.5,
        '.' | '!' | '?' | ';' => 2.0,
        c if c.is_uppercase() => 1.2,
        _ => 1.0,
    }
}

fn roll(rng: &mut dyn RngCore, chance: f64) -> bool {
    rng.gen::<f64>() < chance.clamp(0.0, 1.0)
}

fn ms(value: f64) -> Duration {
    Duration::from_nanos((value.max(0.0) * 1_000_000.0).round() as u64)
}

impl TypingConfig {
    /// How long to wait after typing `c`: jittered base delay, scaled by character
    /// class, plus an occasional thinking pause.
    pub fn char_delay(&self, c: char, rng: &mut dyn RngCore) -> Duration {
        let half = self.speed_variation_ms.max(0.0) / 2.0;
        let jitter = if half > 0.0 {
            rng.gen_range(-half..=half)
        } else {
            0.0
        };

        let mut delay = (self.base_delay_ms + jitter) * class_factor(c);
        if roll(rng, self.pause_chance) {
            delay += self.pause_duration_ms;
        }
        ms(delay)
    }

    /// Whether `c` gets mistyped first. Newlines are never mistyped.
    pub fn should_mistype(&self, c: char, rng: &mut dyn RngCore) -> bool {
        c != '\n' && roll(rng, self.error_chance)
    }

    pub fn error_correct_delay(&self) -> Duration {
        ms(self.error_correct_delay_ms)
    }
}

/// A random lowercase letter that is not `intended`.
pub fn wrong_char(intended: char, rng: &mut dyn RngCore) -> char {
    loop {
        let c = char::from(b'a' + rng.gen_range(0..26u8));
        if c != intended {
            return c;
        }
    }
}
