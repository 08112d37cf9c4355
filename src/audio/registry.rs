use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{
    session::{Announcement, PlaybackSession, SessionOptions},
    sink::VoiceConnector,
};

/// Maps each guild to its playback session, creating sessions lazily.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, PlaybackSession>,
    connector: Arc<dyn VoiceConnector>,
    options: SessionOptions,
    announcements: mpsc::UnboundedSender<Announcement>,
}

impl SessionRegistry {
    pub fn new(
        connector: Arc<dyn VoiceConnector>,
        options: SessionOptions,
        announcements: mpsc::UnboundedSender<Announcement>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            connector,
            options,
            announcements,
        }
    }

    /// Devuelve la sesión del guild, creándola (inactiva) si no existe
    pub fn get_or_create(&self, guild_id: GuildId) -> PlaybackSession {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Nueva sesión de reproducción para guild {}", guild_id);
                PlaybackSession::spawn(
                    guild_id,
                    self.connector.clone(),
                    self.options.clone(),
                    self.announcements.clone(),
                )
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<PlaybackSession> {
        self.sessions.get(&guild_id).map(|session| session.clone())
    }

    /// Cierra y olvida la sesión del guild
    pub async fn remove(&self, guild_id: GuildId) -> bool {
        let Some((_, session)) = self.sessions.remove(&guild_id) else {
            return false;
        };

        if let Err(e) = session.shutdown().await {
            warn!("⚠️ Error al cerrar sesión de guild {}: {}", guild_id, e);
        }
        info!("🗑️ Sesión de guild {} cerrada ({} activas)", guild_id, self.len());
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        error::PlaybackError,
        session::{
            tests::{FakeBackend, FakeConnector},
            PlaybackState,
        },
        track::Track,
    };
    use serenity::model::id::ChannelId;

    fn registry() -> (SessionRegistry, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::default());
        let (announcements, _inbox) = mpsc::unbounded_channel();
        let registry = SessionRegistry::new(
            Arc::new(FakeConnector(backend.clone())),
            SessionOptions::default(),
            announcements,
        );
        (registry, backend)
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_sessions() {
        let (registry, _backend) = registry();
        let guild = GuildId::new(1);

        let first = registry.get_or_create(guild);
        first
            .enqueue(Track::new("A", "https://cdn.example/a.mp3", ChannelId::new(2)))
            .await
            .unwrap();

        let second = registry.get_or_create(guild);
        assert_eq!(second.inspect_queue().await.unwrap(), vec!["A"]);
        assert_eq!(registry.len(), 1);

        let other = registry.get_or_create(GuildId::new(2));
        assert!(other.inspect_queue().await.unwrap().is_empty());
        assert_eq!(other.state().await.unwrap(), PlaybackState::Idle);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_shuts_the_session_down() {
        let (registry, backend) = registry();
        let guild = GuildId::new(1);
        let session = registry.get_or_create(guild);
        session.join(Some(ChannelId::new(10))).await.unwrap();

        assert!(registry.remove(guild).await);
        assert!(!registry.remove(guild).await);

        assert!(registry.get(guild).is_none());
        assert_eq!(*backend.disconnects.lock(), 1);
        assert_eq!(session.state().await, Err(PlaybackError::SessionClosed));
    }
}
