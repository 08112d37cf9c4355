use serenity::model::id::{ChannelId, GuildId};
use tracing::{debug, error, info, warn};

use super::commands::Command;
use crate::{
    audio::{EnqueueOutcome, PlaybackError, PlaybackSession, SessionRegistry},
    sources::{ResolveError, TrackResolver},
    ui::messages,
};

/// Where a command came from.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub guild_id: GuildId,
    pub text_channel: ChannelId,
    /// Voice channel the author is in, if any.
    pub voice_channel: Option<ChannelId>,
    pub prefix: String,
}

/// Ejecuta un comando y devuelve la respuesta para el canal de texto
pub async fn execute(
    registry: &SessionRegistry,
    resolver: &dyn TrackResolver,
    invocation: &Invocation,
    command: Command,
) -> String {
    debug!(
        "⌨️ Comando '{}' en guild {} (canal {})",
        command.name(),
        invocation.guild_id,
        invocation.text_channel
    );

    match command {
        Command::Join => handle_join(registry, invocation).await,
        Command::Leave => handle_leave(registry, invocation).await,
        Command::Play(query) => handle_play(registry, resolver, invocation, &query).await,
        Command::Pause => match existing(registry, invocation) {
            Some(session) => reply(session.pause().await, messages::paused),
            None => messages::NOTHING_PLAYING.to_string(),
        },
        Command::Resume => match existing(registry, invocation) {
            Some(session) => reply(session.resume().await, messages::resumed),
            None => messages::NOT_PAUSED.to_string(),
        },
        Command::Skip => match existing(registry, invocation) {
            Some(session) => reply(session.skip().await, |title| messages::skipped(title.as_deref())),
            None => messages::NOTHING_PLAYING.to_string(),
        },
        Command::Stop => match existing(registry, invocation) {
            Some(session) => reply(session.stop().await, |summary| messages::stopped(&summary)),
            None => messages::stopped(&Default::default()),
        },
        Command::Loop => {
            let session = registry.get_or_create(invocation.guild_id);
            reply(session.toggle_loop().await, messages::loop_status)
        }
        Command::Shuffle => match existing(registry, invocation) {
            Some(session) => reply(session.shuffle_queue().await, messages::shuffled),
            None => messages::QUEUE_EMPTY.to_string(),
        },
        Command::Queue => match existing(registry, invocation) {
            Some(session) => reply(session.inspect_queue().await, |titles| {
                messages::queue_listing(&titles)
            }),
            None => messages::QUEUE_EMPTY.to_string(),
        },
        Command::NowPlaying => match existing(registry, invocation) {
            Some(session) => reply(session.now_playing().await, |title| {
                messages::now_playing(title.as_deref())
            }),
            None => messages::now_playing(None),
        },
        Command::Volume(volume) => {
            let session = registry.get_or_create(invocation.guild_id);
            reply(session.set_volume(volume).await, |()| messages::volume(volume))
        }
        Command::VolumeOutOfRange(volume) => {
            warn!("⚠️ Volumen inválido: {}", volume);
            messages::VOLUME_RANGE.to_string()
        }
        Command::Help => messages::help(&invocation.prefix),
        Command::Invalid(usage) => messages::usage(&invocation.prefix, usage),
    }
}

async fn handle_join(registry: &SessionRegistry, invocation: &Invocation) -> String {
    let session = registry.get_or_create(invocation.guild_id);
    match session.join(invocation.voice_channel).await {
        Ok(outcome) => messages::joined(outcome),
        Err(e) => join_failure(e),
    }
}

async fn handle_leave(registry: &SessionRegistry, invocation: &Invocation) -> String {
    match existing(registry, invocation) {
        Some(session) => reply(session.leave().await, messages::left),
        None => messages::NOT_CONNECTED.to_string(),
    }
}

async fn handle_play(
    registry: &SessionRegistry,
    resolver: &dyn TrackResolver,
    invocation: &Invocation,
    query: &str,
) -> String {
    // Conectar al canal de voz si no está conectado
    let session = registry.get_or_create(invocation.guild_id);
    if let Err(e) = session.join(invocation.voice_channel).await {
        return join_failure(e);
    }

    let track = match resolver.resolve(query, invocation.text_channel).await {
        Ok(track) => track,
        Err(ResolveError::NotFound(_)) => {
            info!("🔍 Sin resultados para '{}' en guild {}", query, invocation.guild_id);
            return messages::no_track_found(query);
        }
        Err(e) => {
            error!("❌ Error al resolver '{}' con {}: {}", query, resolver.source_name(), e);
            return messages::LOOKUP_FAILED.to_string();
        }
    };

    let title = track.title().to_string();
    match session.enqueue(track).await {
        Ok(EnqueueOutcome::Started) => messages::now_playing(Some(&title)),
        Ok(EnqueueOutcome::Queued { position }) => messages::queued(&title, Some(position)),
        Err(PlaybackError::QueueFull { max }) => messages::queue_full(max),
        // La sesión no anuncia los fallos de tracks iniciados por enqueue
        Err(PlaybackError::StreamError(_)) => messages::could_not_play(&title),
        Err(e) => {
            warn!("⚠️ No se pudo encolar '{}' en guild {}: {}", title, invocation.guild_id, e);
            messages::session_error(&e)
        }
    }
}

fn existing(registry: &SessionRegistry, invocation: &Invocation) -> Option<PlaybackSession> {
    registry.get(invocation.guild_id)
}

fn join_failure(error: PlaybackError) -> String {
    match error {
        PlaybackError::NoDestination => messages::NOT_IN_VOICE.to_string(),
        PlaybackError::ConnectionError(reason) => messages::connection_failed(&reason),
        other => messages::session_error(&other),
    }
}

fn reply<T>(result: Result<T, PlaybackError>, render: impl FnOnce(T) -> String) -> String {
    match result {
        Ok(value) => render(value),
        Err(e) => {
            warn!("⚠️ Error de sesión: {}", e);
            messages::session_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{
            session::tests::{FakeBackend, FakeConnector},
            Announcement, SessionOptions, Track,
        },
        sources::MockTrackResolver,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn registry_with_inbox(
        max_queue_size: usize,
    ) -> (SessionRegistry, Arc<FakeBackend>, mpsc::UnboundedReceiver<Announcement>) {
        let backend = Arc::new(FakeBackend::default());
        let (announcements, inbox) = mpsc::unbounded_channel();
        let registry = SessionRegistry::new(
            Arc::new(FakeConnector(backend.clone())),
            SessionOptions {
                max_queue_size,
                ..SessionOptions::default()
            },
            announcements,
        );
        (registry, backend, inbox)
    }

    fn registry(max_queue_size: usize) -> (SessionRegistry, Arc<FakeBackend>) {
        let (registry, backend, _inbox) = registry_with_inbox(max_queue_size);
        (registry, backend)
    }

    fn invocation(voice_channel: Option<ChannelId>) -> Invocation {
        Invocation {
            guild_id: GuildId::new(1),
            text_channel: ChannelId::new(20),
            voice_channel,
            prefix: "!".to_string(),
        }
    }

    fn echo_resolver() -> MockTrackResolver {
        let mut resolver = MockTrackResolver::new();
        resolver.expect_source_name().return_const("spotify");
        resolver.expect_resolve().returning(|query, channel| {
            Ok(Track::new(query, format!("https://cdn.example/{query}.mp3"), channel))
        });
        resolver
    }

    #[tokio::test]
    async fn test_play_joins_and_queues() {
        let (registry, backend) = registry(1000);
        let resolver = echo_resolver();
        let invocation = invocation(Some(ChannelId::new(10)));

        let first = execute(&registry, &resolver, &invocation, Command::Play("A".into())).await;
        assert_eq!(first, "Now playing: **A**");
        let second = execute(&registry, &resolver, &invocation, Command::Play("B".into())).await;
        assert_eq!(second, "Queued: **B** (position 1)");

        assert_eq!(*backend.connects.lock(), vec![ChannelId::new(10)]);
        assert_eq!(backend.started(), vec!["A"]);

        let queue = execute(&registry, &resolver, &invocation, Command::Queue).await;
        assert_eq!(queue, "Upcoming tracks:\n1. B\n");
        let now = execute(&registry, &resolver, &invocation, Command::NowPlaying).await;
        assert_eq!(now, "Now playing: **A**");
    }

    #[tokio::test]
    async fn test_play_requires_voice_channel() {
        let (registry, backend) = registry(1000);
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().never();

        let reply = execute(&registry, &resolver, &invocation(None), Command::Play("A".into())).await;
        assert_eq!(reply, messages::NOT_IN_VOICE);
        assert!(backend.connects.lock().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failures() {
        let (registry, _backend) = registry(1000);
        let invocation = invocation(Some(ChannelId::new(10)));

        let mut missing = MockTrackResolver::new();
        missing.expect_source_name().return_const("spotify");
        missing
            .expect_resolve()
            .returning(|query, _| Err(ResolveError::NotFound(query.to_string())));
        let reply = execute(&registry, &missing, &invocation, Command::Play("zzz".into())).await;
        assert_eq!(reply, "No track found for: zzz");

        let mut broken = MockTrackResolver::new();
        broken.expect_source_name().return_const("spotify");
        broken
            .expect_resolve()
            .returning(|_, _| Err(ResolveError::Auth("401".to_string())));
        let reply = execute(&registry, &broken, &invocation, Command::Play("zzz".into())).await;
        assert_eq!(reply, messages::LOOKUP_FAILED);
    }

    #[tokio::test]
    async fn test_queue_full_reply() {
        let (registry, _backend) = registry(1);
        let resolver = echo_resolver();
        let invocation = invocation(Some(ChannelId::new(10)));

        execute(&registry, &resolver, &invocation, Command::Play("A".into())).await;
        execute(&registry, &resolver, &invocation, Command::Play("B".into())).await;
        let reply = execute(&registry, &resolver, &invocation, Command::Play("C".into())).await;
        assert_eq!(reply, "The queue is full (1 tracks max).");
    }

    #[tokio::test]
    async fn test_controls_without_session() {
        let (registry, _backend) = registry(1000);
        let resolver = MockTrackResolver::new();
        let invocation = invocation(None);

        assert_eq!(
            execute(&registry, &resolver, &invocation, Command::Skip).await,
            messages::NOTHING_PLAYING
        );
        assert_eq!(
            execute(&registry, &resolver, &invocation, Command::Resume).await,
            messages::NOT_PAUSED
        );
        assert_eq!(
            execute(&registry, &resolver, &invocation, Command::Leave).await,
            messages::NOT_CONNECTED
        );
        assert_eq!(
            execute(&registry, &resolver, &invocation, Command::Queue).await,
            messages::QUEUE_EMPTY
        );
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_pause_resume_skip_stop() {
        let (registry, backend) = registry(1000);
        let resolver = echo_resolver();
        let invocation = invocation(Some(ChannelId::new(10)));

        execute(&registry, &resolver, &invocation, Command::Play("A".into())).await;
        execute(&registry, &resolver, &invocation, Command::Play("B".into())).await;
        execute(&registry, &resolver, &invocation, Command::Play("C".into())).await;

        let paused = execute(&registry, &resolver, &invocation, Command::Pause).await;
        assert_eq!(paused, "Paused the track.");
        let resumed = execute(&registry, &resolver, &invocation, Command::Resume).await;
        assert_eq!(resumed, "Resumed the track.");

        let skipped = execute(&registry, &resolver, &invocation, Command::Skip).await;
        assert_eq!(skipped, "Skipped **A**.");
        assert_eq!(backend.started(), vec!["A", "B"]);

        let stopped = execute(&registry, &resolver, &invocation, Command::Stop).await;
        assert_eq!(stopped, "Stopped playback and cleared 1 queued track(s).");
    }

    #[tokio::test]
    async fn test_join_errors() {
        let (registry, backend) = registry(1000);
        let resolver = MockTrackResolver::new();

        let reply = execute(&registry, &resolver, &invocation(None), Command::Join).await;
        assert_eq!(reply, messages::NOT_IN_VOICE);

        *backend.refuse_connect.lock() = true;
        let reply = execute(&registry, &resolver, &invocation(Some(ChannelId::new(10))), Command::Join).await;
        assert_eq!(reply, "Could not join the voice channel: missing permissions");
    }

    #[tokio::test]
    async fn test_help_and_usage_use_prefix() {
        let (registry, _backend) = registry(1000);
        let resolver = MockTrackResolver::new();
        let invocation = invocation(None);

        let reply = execute(&registry, &resolver, &invocation, Command::Invalid("play <query>")).await;
        assert_eq!(reply, "Usage: `!play <query>`");
        let help = execute(&registry, &resolver, &invocation, Command::Help).await;
        assert!(help.contains("`!skip`"));
    }

    #[tokio::test]
    async fn test_unplayable_track_gets_one_reply() {
        let (registry, backend, mut inbox) = registry_with_inbox(1000);
        backend.unplayable.lock().insert("BROKEN".to_string());
        let resolver = echo_resolver();
        let invocation = invocation(Some(ChannelId::new(10)));

        let reply = execute(&registry, &resolver, &invocation, Command::Play("BROKEN".into())).await;
        assert_eq!(reply, "Could not play: **BROKEN**");
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_volume_commands() {
        let (registry, backend) = registry(1000);
        let resolver = echo_resolver();
        let invocation = invocation(Some(ChannelId::new(10)));

        execute(&registry, &resolver, &invocation, Command::Play("A".into())).await;
        let reply = execute(&registry, &resolver, &invocation, Command::Volume(75)).await;
        assert_eq!(reply, "Volume set to 75%.");
        assert_eq!(*backend.volumes.lock(), vec!["A@50", "A@75"]);

        let reply = execute(&registry, &resolver, &invocation, Command::VolumeOutOfRange(150)).await;
        assert_eq!(reply, messages::VOLUME_RANGE);
        assert_eq!(backend.volumes.lock().len(), 2);
    }
}
