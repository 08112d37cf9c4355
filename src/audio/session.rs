//! Per-guild playback session.
//!
//! [`PlaybackSession`] is a cloneable handle. All state lives in a
//! [`SessionActor`] task that processes one [`SessionCommand`] at a time, so
//! commands from the dispatcher and stream-end notifications from the audio
//! backend are serialized through the same mailbox.

use chrono::Utc;
use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::{
    error::PlaybackError,
    queue::PlaybackQueue,
    sink::{AudioSink, CompletionNotifier, StreamControl, StreamId, StreamOutcome, VoiceConnector},
    track::Track,
};

/// Observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No voice connection.
    Idle,
    /// Connected, nothing playing.
    ConnectedEmpty,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(ChannelId),
    AlreadyConnected(ChannelId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The track became current immediately.
    Started,
    /// The track waits in the queue at this 1-based position.
    Queued { position: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopSummary {
    pub stopped: Option<String>,
    pub cleared: usize,
}

/// Plain-text status line addressed to a text channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub channel: ChannelId,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_queue_size: usize,
    /// Re-append skipped tracks while loop is on.
    pub requeue_skipped_on_loop: bool,
    /// Volume in percent applied to every new stream.
    pub default_volume: u8,
}

/// Highest accepted volume, in percent.
pub const MAX_VOLUME: u8 = 100;

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_queue_size: 1000,
            requeue_skipped_on_loop: false,
            default_volume: 50,
        }
    }
}

type Reply<T> = oneshot::Sender<T>;

pub(crate) enum SessionCommand {
    Join {
        channel: Option<ChannelId>,
        reply: Reply<Result<JoinOutcome, PlaybackError>>,
    },
    Leave {
        reply: Reply<bool>,
    },
    Enqueue {
        track: Track,
        reply: Reply<Result<EnqueueOutcome, PlaybackError>>,
    },
    Pause {
        reply: Reply<bool>,
    },
    Resume {
        reply: Reply<bool>,
    },
    Skip {
        reply: Reply<Option<String>>,
    },
    Stop {
        reply: Reply<StopSummary>,
    },
    ToggleLoop {
        reply: Reply<bool>,
    },
    Shuffle {
        reply: Reply<usize>,
    },
    InspectQueue {
        reply: Reply<Vec<String>>,
    },
    NowPlaying {
        reply: Reply<Option<String>>,
    },
    State {
        reply: Reply<PlaybackState>,
    },
    SetVolume {
        volume: u8,
        reply: Reply<Result<(), PlaybackError>>,
    },
    ChannelMoved {
        channel: ChannelId,
        reply: Reply<bool>,
    },
    Shutdown {
        reply: Reply<()>,
    },
    StreamEnded {
        stream_id: StreamId,
        outcome: StreamOutcome,
    },
}

/// Handle to one guild's playback session.
#[derive(Clone)]
pub struct PlaybackSession {
    guild_id: GuildId,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl PlaybackSession {
    /// Spawns the session task on the current tokio runtime.
    pub fn spawn(
        guild_id: GuildId,
        connector: Arc<dyn VoiceConnector>,
        options: SessionOptions,
        announcements: mpsc::UnboundedSender<Announcement>,
    ) -> Self {
        let (commands, mailbox) = mpsc::unbounded_channel();
        let actor = SessionActor {
            guild_id,
            connector,
            announcements,
            mailbox: commands.downgrade(),
            connection: None,
            queue: PlaybackQueue::new(options.max_queue_size),
            current: None,
            loop_enabled: false,
            last_stream_id: 0,
            volume: options.default_volume,
            options,
        };
        tokio::spawn(actor.run(mailbox));

        Self { guild_id, commands }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, PlaybackError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| PlaybackError::SessionClosed)?;
        response.await.map_err(|_| PlaybackError::SessionClosed)
    }

    pub async fn join(&self, channel: Option<ChannelId>) -> Result<JoinOutcome, PlaybackError> {
        self.request(|reply| SessionCommand::Join { channel, reply }).await?
    }

    /// Returns `false` when there was no connection to release.
    pub async fn leave(&self) -> Result<bool, PlaybackError> {
        self.request(|reply| SessionCommand::Leave { reply }).await
    }

    pub async fn enqueue(&self, track: Track) -> Result<EnqueueOutcome, PlaybackError> {
        self.request(|reply| SessionCommand::Enqueue { track, reply }).await?
    }

    /// Returns `false` when nothing was playing.
    pub async fn pause(&self) -> Result<bool, PlaybackError> {
        self.request(|reply| SessionCommand::Pause { reply }).await
    }

    /// Returns `false` when nothing was paused.
    pub async fn resume(&self) -> Result<bool, PlaybackError> {
        self.request(|reply| SessionCommand::Resume { reply }).await
    }

    /// Returns the title of the skipped track, if any.
    pub async fn skip(&self) -> Result<Option<String>, PlaybackError> {
        self.request(|reply| SessionCommand::Skip { reply }).await
    }

    pub async fn stop(&self) -> Result<StopSummary, PlaybackError> {
        self.request(|reply| SessionCommand::Stop { reply }).await
    }

    /// Returns the new loop flag.
    pub async fn toggle_loop(&self) -> Result<bool, PlaybackError> {
        self.request(|reply| SessionCommand::ToggleLoop { reply }).await
    }

    /// Returns how many queued tracks were shuffled.
    pub async fn shuffle_queue(&self) -> Result<usize, PlaybackError> {
        self.request(|reply| SessionCommand::Shuffle { reply }).await
    }

    pub async fn inspect_queue(&self) -> Result<Vec<String>, PlaybackError> {
        self.request(|reply| SessionCommand::InspectQueue { reply }).await
    }

    pub async fn now_playing(&self) -> Result<Option<String>, PlaybackError> {
        self.request(|reply| SessionCommand::NowPlaying { reply }).await
    }

    pub async fn state(&self) -> Result<PlaybackState, PlaybackError> {
        self.request(|reply| SessionCommand::State { reply }).await
    }

    /// Sets the volume (percent) for the current and all later tracks.
    pub async fn set_volume(&self, volume: u8) -> Result<(), PlaybackError> {
        self.request(|reply| SessionCommand::SetVolume { volume, reply }).await?
    }

    /// Records that the bot was moved to another voice channel.
    /// Returns `false` when there is no connection or nothing changed.
    pub async fn channel_moved(&self, channel: ChannelId) -> Result<bool, PlaybackError> {
        self.request(|reply| SessionCommand::ChannelMoved { channel, reply }).await
    }

    /// Leaves the voice channel and ends the session task.
    pub async fn shutdown(&self) -> Result<(), PlaybackError> {
        self.request(|reply| SessionCommand::Shutdown { reply }).await
    }
}

struct Connection {
    channel: ChannelId,
    sink: Box<dyn AudioSink>,
}

struct NowPlaying {
    stream_id: StreamId,
    track: Track,
    control: Box<dyn StreamControl>,
    paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdvanceReason {
    Start,
    /// Started by `enqueue`; the caller reports the outcome itself.
    Requested,
    Completed,
    Skipped,
}

struct SessionActor {
    guild_id: GuildId,
    connector: Arc<dyn VoiceConnector>,
    options: SessionOptions,
    announcements: mpsc::UnboundedSender<Announcement>,
    /// Weak so the task ends once every handle and notifier is gone.
    mailbox: mpsc::WeakUnboundedSender<SessionCommand>,
    connection: Option<Connection>,
    queue: PlaybackQueue,
    current: Option<NowPlaying>,
    loop_enabled: bool,
    last_stream_id: StreamId,
    volume: u8,
}

impl SessionActor {
    async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<SessionCommand>) {
        debug!("🎛️ Sesión iniciada para guild {}", self.guild_id);

        while let Some(command) = mailbox.recv().await {
            match command {
                SessionCommand::Shutdown { reply } => {
                    self.leave().await;
                    let _ = reply.send(());
                    break;
                }
                command => self.handle(command).await,
            }
        }

        if self.connection.is_some() {
            self.leave().await;
        }
        debug!("🛑 Sesión finalizada para guild {}", self.guild_id);
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Join { channel, reply } => {
                let _ = reply.send(self.join(channel).await);
            }
            SessionCommand::Leave { reply } => {
                let _ = reply.send(self.leave().await);
            }
            SessionCommand::Enqueue { track, reply } => {
                let _ = reply.send(self.enqueue(track).await);
            }
            SessionCommand::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            SessionCommand::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            SessionCommand::Skip { reply } => {
                let _ = reply.send(self.skip().await);
            }
            SessionCommand::Stop { reply } => {
                let _ = reply.send(self.stop());
            }
            SessionCommand::ToggleLoop { reply } => {
                self.loop_enabled = !self.loop_enabled;
                info!(
                    "🔁 Loop {} en guild {}",
                    if self.loop_enabled { "activado" } else { "desactivado" },
                    self.guild_id
                );
                let _ = reply.send(self.loop_enabled);
            }
            SessionCommand::Shuffle { reply } => {
                self.queue.shuffle();
                let _ = reply.send(self.queue.len());
            }
            SessionCommand::InspectQueue { reply } => {
                let _ = reply.send(self.queue.titles());
            }
            SessionCommand::NowPlaying { reply } => {
                let title = self.current.as_ref().map(|now| now.track.title().to_string());
                let _ = reply.send(title);
            }
            SessionCommand::State { reply } => {
                let _ = reply.send(self.state());
            }
            SessionCommand::SetVolume { volume, reply } => {
                let _ = reply.send(self.set_volume(volume));
            }
            SessionCommand::ChannelMoved { channel, reply } => {
                let _ = reply.send(self.channel_moved(channel));
            }
            // `run` intercepta Shutdown antes de llegar aquí
            SessionCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
            SessionCommand::StreamEnded { stream_id, outcome } => {
                self.stream_ended(stream_id, outcome).await;
            }
        }
    }

    fn state(&self) -> PlaybackState {
        match (&self.connection, &self.current) {
            (None, _) => PlaybackState::Idle,
            (Some(_), None) => PlaybackState::ConnectedEmpty,
            (Some(_), Some(now)) if now.paused => PlaybackState::Paused,
            (Some(_), Some(_)) => PlaybackState::Playing,
        }
    }

    async fn join(&mut self, channel: Option<ChannelId>) -> Result<JoinOutcome, PlaybackError> {
        if let Some(connection) = &self.connection {
            debug!("Ya conectado al canal {} en guild {}", connection.channel, self.guild_id);
            return Ok(JoinOutcome::AlreadyConnected(connection.channel));
        }

        let channel = channel.ok_or(PlaybackError::NoDestination)?;
        let sink = self
            .connector
            .connect(self.guild_id, channel)
            .await
            .inspect_err(|e| error!("❌ Error al conectar al canal de voz en guild {}: {}", self.guild_id, e))?;

        self.connection = Some(Connection { channel, sink });
        info!("🔊 Conectado al canal {} en guild {}", channel, self.guild_id);

        // Tracks encolados mientras la sesión estaba inactiva
        if !self.queue.is_empty() {
            self.advance(AdvanceReason::Start).await;
        }

        Ok(JoinOutcome::Joined(channel))
    }

    async fn leave(&mut self) -> bool {
        let Some(connection) = self.connection.take() else {
            debug!("Leave sin conexión en guild {}", self.guild_id);
            return false;
        };

        self.halt_current();
        self.queue.clear();
        connection.sink.disconnect().await;

        info!("👋 Desconectado del canal {} en guild {}", connection.channel, self.guild_id);
        true
    }

    async fn enqueue(&mut self, track: Track) -> Result<EnqueueOutcome, PlaybackError> {
        let title = track.title().to_string();
        let position = self.queue.push(track)?;

        if self.connection.is_none() || self.current.is_some() {
            return Ok(EnqueueOutcome::Queued { position });
        }

        self.advance(AdvanceReason::Requested).await;
        match self.current {
            Some(_) => Ok(EnqueueOutcome::Started),
            None => Err(PlaybackError::StreamError(format!("could not start {title}"))),
        }
    }

    fn pause(&mut self) -> bool {
        let Some(now) = self.current.as_mut().filter(|now| !now.paused) else {
            debug!("Nada que pausar en guild {}", self.guild_id);
            return false;
        };

        match now.control.pause() {
            Ok(()) => {
                now.paused = true;
                info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
                true
            }
            Err(e) => {
                warn!("⚠️ No se pudo pausar en guild {}: {}", self.guild_id, e);
                false
            }
        }
    }

    fn resume(&mut self) -> bool {
        let Some(now) = self.current.as_mut().filter(|now| now.paused) else {
            debug!("Nada que reanudar en guild {}", self.guild_id);
            return false;
        };

        match now.control.resume() {
            Ok(()) => {
                now.paused = false;
                info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
                true
            }
            Err(e) => {
                warn!("⚠️ No se pudo reanudar en guild {}: {}", self.guild_id, e);
                false
            }
        }
    }

    async fn skip(&mut self) -> Option<String> {
        let now = self.current.as_ref()?;
        let title = now.track.title().to_string();

        if let Err(e) = now.control.stop() {
            warn!("⚠️ Error al detener stream en guild {}: {}", self.guild_id, e);
        }
        info!("⏭️ Saltado: {}", title);

        self.advance(AdvanceReason::Skipped).await;
        Some(title)
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), PlaybackError> {
        if volume > MAX_VOLUME {
            return Err(PlaybackError::InvalidVolume(volume));
        }

        self.volume = volume;
        info!("🔊 Volumen ajustado a {}% en guild {}", volume, self.guild_id);
        match &self.current {
            Some(now) => now.control.set_volume(gain(volume)),
            None => Ok(()),
        }
    }

    fn channel_moved(&mut self, channel: ChannelId) -> bool {
        let Some(connection) = self.connection.as_mut().filter(|c| c.channel != channel) else {
            return false;
        };

        info!(
            "🚚 Movido del canal {} al {} en guild {}",
            connection.channel, channel, self.guild_id
        );
        connection.channel = channel;
        true
    }

    fn stop(&mut self) -> StopSummary {
        let stopped = self.halt_current().map(|track| track.title().to_string());
        let cleared = self.queue.clear();

        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
        StopSummary { stopped, cleared }
    }

    async fn stream_ended(&mut self, stream_id: StreamId, outcome: StreamOutcome) {
        let is_current = self
            .current
            .as_ref()
            .is_some_and(|now| now.stream_id == stream_id);
        if !is_current {
            debug!("Fin de stream {} ignorado (ya no es el actual)", stream_id);
            return;
        }

        match outcome {
            StreamOutcome::Finished => debug!("🎵 Track terminado en guild {}", self.guild_id),
            StreamOutcome::Failed(reason) => {
                warn!("⚠️ Error de stream en guild {}: {}", self.guild_id, reason)
            }
        }

        self.advance(AdvanceReason::Completed).await;
    }

    /// Detiene el stream actual sin avanzar la cola
    fn halt_current(&mut self) -> Option<Track> {
        let now = self.current.take()?;
        if let Err(e) = now.control.stop() {
            warn!("⚠️ Error al detener stream en guild {}: {}", self.guild_id, e);
        }
        Some(now.track)
    }

    /// Retira el track actual y promueve el siguiente de la cola
    async fn advance(&mut self, reason: AdvanceReason) {
        let mut last_channel = None;

        if let Some(finished) = self.current.take() {
            last_channel = Some(finished.track.requested_by());

            let requeue = self.loop_enabled
                && match reason {
                    AdvanceReason::Completed => true,
                    AdvanceReason::Skipped => self.options.requeue_skipped_on_loop,
                    AdvanceReason::Start | AdvanceReason::Requested => false,
                };
            if requeue {
                self.queue.requeue(finished.track);
            }
        }

        let Some(connection) = self.connection.as_ref() else {
            return;
        };

        while let Some(track) = self.queue.pop() {
            let Some(mailbox) = self.mailbox.upgrade() else {
                return;
            };
            self.last_stream_id += 1;
            let stream_id = self.last_stream_id;
            let notifier = CompletionNotifier::new(stream_id, mailbox);

            match connection.sink.start_stream(&track, notifier).await {
                Ok(control) => {
                    if let Err(e) = control.set_volume(gain(self.volume)) {
                        warn!("⚠️ No se pudo aplicar el volumen en guild {}: {}", self.guild_id, e);
                    }

                    let waited = (Utc::now() - track.requested_at()).to_std().unwrap_or_default();
                    info!(
                        "🎵 Reproduciendo: {} en guild {} (stream {}, {} en cola)",
                        track.title(),
                        self.guild_id,
                        stream_id,
                        humantime::format_duration(Duration::from_secs(waited.as_secs()))
                    );
                    if reason != AdvanceReason::Requested {
                        announce(
                            &self.announcements,
                            track.requested_by(),
                            format!("Now playing: {}", track.title()),
                        );
                    }
                    self.current = Some(NowPlaying {
                        stream_id,
                        track,
                        control,
                        paused: false,
                    });
                    return;
                }
                Err(e) => {
                    error!("❌ No se pudo reproducir {}: {}", track.title(), e);
                    if reason != AdvanceReason::Requested {
                        announce(
                            &self.announcements,
                            track.requested_by(),
                            format!("Could not play: {}", track.title()),
                        );
                    }
                }
            }
        }

        info!("📭 Cola vacía en guild {}", self.guild_id);
        if reason == AdvanceReason::Completed {
            if let Some(channel) = last_channel {
                announce(&self.announcements, channel, "Queue is empty.".to_string());
            }
        }
    }
}

fn gain(volume: u8) -> f32 {
    f32::from(volume) / 100.0
}

fn announce(announcements: &mpsc::UnboundedSender<Announcement>, channel: ChannelId, text: String) {
    if announcements.send(Announcement { channel, text }).is_err() {
        debug!("Canal de anuncios cerrado");
    }
}
