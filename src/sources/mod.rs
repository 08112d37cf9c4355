pub mod censor;
pub mod direct_url;
pub mod spotify;

use async_trait::async_trait;
use serenity::model::id::ChannelId;
use thiserror::Error;
use tracing::debug;

use crate::audio::Track;

pub use direct_url::DirectUrlResolver;
pub use spotify::SpotifyClient;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no track found for: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Turns a free-text query into a playable track.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: ChannelId) -> Result<Track, ResolveError>;

    /// Nombre de la fuente
    fn source_name(&self) -> &'static str;
}

/// Envía URLs al resolver directo y el resto de búsquedas a Spotify
pub struct SmartResolver {
    direct: DirectUrlResolver,
    search: Box<dyn TrackResolver>,
}

impl SmartResolver {
    pub fn new(search: Box<dyn TrackResolver>) -> Self {
        Self {
            direct: DirectUrlResolver::new(),
            search,
        }
    }
}

#[async_trait]
impl TrackResolver for SmartResolver {
    async fn resolve(&self, query: &str, requested_by: ChannelId) -> Result<Track, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::NotFound(String::new()));
        }

        if self.direct.is_valid_url(query) {
            debug!("🔗 Query es una URL directa: {}", query);
            return self.direct.resolve(query, requested_by).await;
        }

        debug!("🔍 Buscando en {}: {}", self.search.source_name(), query);
        self.search.resolve(query, requested_by).await
    }

    fn source_name(&self) -> &'static str {
        "smart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_urls_bypass_the_search_resolver() {
        let mut search = MockTrackResolver::new();
        search.expect_resolve().never();
        search.expect_source_name().return_const("spotify");

        let resolver = SmartResolver::new(Box::new(search));
        let track = resolver
            .resolve("https://cdn.example/music/song.mp3", ChannelId::new(1))
            .await
            .unwrap();

        assert_eq!(track.title(), "song.mp3");
    }

    #[tokio::test]
    async fn test_text_queries_go_to_search() {
        let mut search = MockTrackResolver::new();
        search.expect_source_name().return_const("spotify");
        search
            .expect_resolve()
            .with(eq("never gonna give you up"), eq(ChannelId::new(1)))
            .times(1)
            .returning(|query, channel| Ok(Track::new(query, "https://p.scdn.co/preview", channel)));

        let resolver = SmartResolver::new(Box::new(search));
        let track = resolver
            .resolve("  never gonna give you up ", ChannelId::new(1))
            .await
            .unwrap();

        assert_eq!(track.title(), "never gonna give you up");
    }

    #[tokio::test]
    async fn test_blank_query_is_not_found() {
        let resolver = SmartResolver::new(Box::new(MockTrackResolver::new()));
        assert!(matches!(
            resolver.resolve("   ", ChannelId::new(1)).await,
            Err(ResolveError::NotFound(_))
        ));
    }
}
