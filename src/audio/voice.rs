//! Songbird-backed audio sink.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input, YoutubeDl},
    tracks::TrackHandle,
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{
    error::PlaybackError,
    sink::{AudioSink, CompletionNotifier, StreamControl, StreamOutcome, VoiceConnector},
    track::{PlayableSource, Track},
};

/// Opens voice connections through the shared Songbird manager.
pub struct SongbirdConnector {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdConnector {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Box<dyn AudioSink>, PlaybackError> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| PlaybackError::ConnectionError(e.to_string()))?;

        Ok(Box::new(SongbirdSink {
            guild_id,
            call,
            manager: self.manager.clone(),
            http: self.http.clone(),
        }))
    }
}

pub struct SongbirdSink {
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdSink {
    fn input_for(&self, track: &Track) -> Input {
        match track.source() {
            PlayableSource::Direct(url) => HttpRequest::new(self.http.clone(), url.to_string()).into(),
            PlayableSource::Search(query) => {
                YoutubeDl::new_search(self.http.clone(), query.to_string()).into()
            }
        }
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn start_stream(
        &self,
        track: &Track,
        notifier: CompletionNotifier,
    ) -> Result<Box<dyn StreamControl>, PlaybackError> {
        let input = self.input_for(track);

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndHandler {
                    notifier: notifier.clone(),
                },
            )
            .map_err(|e| PlaybackError::StreamError(e.to_string()))?;
        handle
            .add_event(Event::Track(TrackEvent::Error), TrackErrorHandler { notifier })
            .map_err(|e| PlaybackError::StreamError(e.to_string()))?;

        debug!("🎧 Stream iniciado en guild {}: {}", self.guild_id, track.playable_url());
        Ok(Box::new(SongbirdStream(handle)))
    }

    async fn disconnect(&self) {
        if let Err(e) = self.manager.remove(self.guild_id).await {
            // Ya desconectado (p. ej. expulsado del canal)
            warn!("⚠️ Error al salir del canal de voz en guild {}: {:?}", self.guild_id, e);
        } else {
            info!("👋 Songbird desconectado en guild {}", self.guild_id);
        }
    }
}

struct SongbirdStream(TrackHandle);

impl StreamControl for SongbirdStream {
    fn pause(&self) -> Result<(), PlaybackError> {
        self.0
            .pause()
            .map_err(|e| PlaybackError::StreamError(e.to_string()))
    }

    fn resume(&self) -> Result<(), PlaybackError> {
        self.0
            .play()
            .map_err(|e| PlaybackError::StreamError(e.to_string()))
    }

    fn stop(&self) -> Result<(), PlaybackError> {
        self.0
            .stop()
            .map_err(|e| PlaybackError::StreamError(e.to_string()))
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        self.0
            .set_volume(volume)
            .map_err(|e| PlaybackError::StreamError(e.to_string()))
    }
}

/// Handler para cuando termina una canción
struct TrackEndHandler {
    notifier: CompletionNotifier,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        debug!("🎵 Stream {} terminado", self.notifier.stream_id());
        self.notifier.notify(StreamOutcome::Finished);
        None
    }
}

/// Handler para errores de tracks
struct TrackErrorHandler {
    notifier: CompletionNotifier,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let reason = match ctx {
            EventContext::Track(track_list) => track_list
                .iter()
                .map(|(state, _handle)| format!("{:?}", state.playing))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "unknown".to_string(),
        };

        error!("❌ Error en stream {}: {}", self.notifier.stream_id(), reason);
        self.notifier.notify(StreamOutcome::Failed(reason));
        None
    }
}
