// Library surface for the binary, headless runs and integration tests.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod playback;
pub mod runtime;
pub mod sink;
pub mod snippet;
pub mod sound;
pub mod typing_policy;

pub use engine::{TypingEngine, TypingEvent};
pub use playback::{Intent, Phase, PlaybackController, PlaybackEvent};
pub use snippet::{Snippet, SnippetDeck};
