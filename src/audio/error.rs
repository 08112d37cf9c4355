use thiserror::Error;

/// Errors surfaced by a [`PlaybackSession`](super::session::PlaybackSession).
///
/// None of these are fatal: the session stays usable after any of them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// `join` was called without a voice channel to join.
    #[error("no voice channel to join")]
    NoDestination,

    /// The audio sink could not connect to the voice channel.
    #[error("could not connect to the voice channel: {0}")]
    ConnectionError(String),

    /// The audio sink failed to start or control a stream.
    #[error("stream error: {0}")]
    StreamError(String),

    /// The queue already holds the configured maximum of tracks.
    #[error("the queue is full (max {max} tracks)")]
    QueueFull { max: usize },

    /// Volume outside `0..=100`.
    #[error("volume must be between 0 and 100 (got {0})")]
    InvalidVolume(u8),

    /// The session task is gone.
    #[error("playback session closed")]
    SessionClosed,
}
