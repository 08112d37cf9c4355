//! Contracts between a playback session and the audio backend.
//!
//! A [`VoiceConnector`] opens an [`AudioSink`] for one voice channel; the sink
//! starts streams and hands back a [`StreamControl`] per stream. Stream ends
//! come back through a [`CompletionNotifier`], which only posts a message to
//! the session's mailbox and never touches session state itself.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc;
use tracing::debug;

use super::{error::PlaybackError, session::SessionCommand, track::Track};

/// Identifies one started stream within a session.
pub type StreamId = u64;

/// How a stream ended, as reported by the audio backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Finished,
    Failed(String),
}

#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Box<dyn AudioSink>, PlaybackError>;
}

/// A held connection to one voice channel.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Starts streaming `track`. Must not wait for the stream to finish.
    async fn start_stream(
        &self,
        track: &Track,
        notifier: CompletionNotifier,
    ) -> Result<Box<dyn StreamControl>, PlaybackError>;

    async fn disconnect(&self);
}

/// Control over a single running stream.
pub trait StreamControl: Send + Sync {
    fn pause(&self) -> Result<(), PlaybackError>;
    fn resume(&self) -> Result<(), PlaybackError>;
    fn stop(&self) -> Result<(), PlaybackError>;
    /// `1.0` is the source's own level.
    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError>;
}

/// Delivers the end of one stream back to the owning session.
#[derive(Debug, Clone)]
pub struct CompletionNotifier {
    stream_id: StreamId,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl CompletionNotifier {
    pub(crate) fn new(stream_id: StreamId, commands: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { stream_id, commands }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Safe to call from any thread, any number of times; repeats are ignored
    /// by the session.
    pub fn notify(&self, outcome: StreamOutcome) {
        let message = SessionCommand::StreamEnded {
            stream_id: self.stream_id,
            outcome,
        };
        if self.commands.send(message).is_err() {
            debug!("Sesión cerrada, notificación de fin de stream {} descartada", self.stream_id);
        }
    }
}
