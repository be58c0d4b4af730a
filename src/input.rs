use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::playback::Intent;

/// What a key press asks the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Playback(Intent),
    Faster,
    Slower,
    ToggleSound,
    Quit,
}

pub const MIN_DELAY_MS: f64 = 5.0;
pub const MAX_DELAY_MS: f64 = 1000.0;
const SPEED_STEP: f64 = 1.5;

pub fn action_for_key(key: KeyEvent) -> Option<KeyAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(KeyAction::Quit),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n') => {
            KeyAction::Playback(Intent::Advance)
        }
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('p') => {
            KeyAction::Playback(Intent::Retreat)
        }
        KeyCode::Char(c @ '1'..='9') => {
            KeyAction::Playback(Intent::Jump(c as usize - '1' as usize))
        }
        KeyCode::Char(' ') => KeyAction::Playback(Intent::TogglePause),
        KeyCode::Char('+') | KeyCode::Char('=') => KeyAction::Faster,
        KeyCode::Char('-') => KeyAction::Slower,
        KeyCode::Char('m') => KeyAction::ToggleSound,
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// New base delay after a Faster/Slower press.
pub fn adjust_delay(current_ms: f64, faster: bool) -> f64 {
    let next = if faster {
        current_ms / SPEED_STEP
    } else {
        current_ms * SPEED_STEP
    };
    next.clamp(MIN_DELAY_MS, MAX_DELAY_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn navigation_keys() {
        assert_eq!(
            action_for_key(key(KeyCode::Right)),
            Some(KeyAction::Playback(Intent::Advance))
        );
        assert_eq!(
            action_for_key(key(KeyCode::Char('h'))),
            Some(KeyAction::Playback(Intent::Retreat))
        );
        assert_eq!(
            action_for_key(key(KeyCode::Char(' '))),
            Some(KeyAction::Playback(Intent::TogglePause))
        );
    }

    #[test]
    fn digits_jump_zero_based() {
        assert_eq!(
            action_for_key(key(KeyCode::Char('1'))),
            Some(KeyAction::Playback(Intent::Jump(0)))
        );
        assert_eq!(
            action_for_key(key(KeyCode::Char('9'))),
            Some(KeyAction::Playback(Intent::Jump(8)))
        );
        assert_eq!(action_for_key(key(KeyCode::Char('0'))), None);
    }

    #[test]
    fn quit_keys() {
        assert_eq!(action_for_key(key(KeyCode::Esc)), Some(KeyAction::Quit));
        assert_eq!(
            action_for_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            action_for_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn speed_adjustment_is_clamped() {
        assert_eq!(adjust_delay(60.0, true), 40.0);
        assert_eq!(adjust_delay(40.0, false), 60.0);
        assert_eq!(adjust_delay(6.0, true), MIN_DELAY_MS);
        assert_eq!(adjust_delay(900.0, false), MAX_DELAY_MS);
    }
}
