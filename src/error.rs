//! Error types shared across the crate.

use std::path::PathBuf;

/// An [`OutputSink`](crate::sink::OutputSink) refused a write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("output sink rejected write: {0}")]
pub struct SinkError(pub String);

/// Errors raised synchronously by [`TypingEngine`](crate::engine::TypingEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("a typing session is already active")]
    SessionActive,

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Errors raised synchronously by [`PlaybackController`](crate::playback::PlaybackController).
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("no snippets to play")]
    NoSnippets,

    #[error("playback has already started")]
    AlreadyStarted,
}

/// Errors loading or validating a snippet list.
#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    #[error("snippet list is empty")]
    Empty,

    #[error("duplicate snippet id '{0}'")]
    DuplicateId(String),

    #[error("snippet '{id}' has no code")]
    EmptyCode { id: String },

    #[error("invalid snippet json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors validating a [`Config`](crate::config::Config).
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    InvalidProbability { field: &'static str, value: f64 },
}
