use async_trait::async_trait;
use serenity::model::id::ChannelId;
use url::Url;

use super::{ResolveError, TrackResolver};
use crate::audio::Track;

/// Resolver para URLs de audio directas
#[derive(Debug, Default)]
pub struct DirectUrlResolver;

impl DirectUrlResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn is_valid_url(&self, query: &str) -> bool {
        Url::parse(query)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false)
    }

    fn title_for(url: &Url) -> String {
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string)
            .or_else(|| url.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string())
    }
}

#[async_trait]
impl TrackResolver for DirectUrlResolver {
    async fn resolve(&self, query: &str, requested_by: ChannelId) -> Result<Track, ResolveError> {
        let url = Url::parse(query.trim()).map_err(|_| ResolveError::NotFound(query.to_string()))?;
        if !self.is_valid_url(url.as_str()) {
            return Err(ResolveError::NotFound(query.to_string()));
        }

        Ok(Track::new(Self::title_for(&url), url.as_str(), requested_by))
    }

    fn source_name(&self) -> &'static str {
        "direct"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_detection() {
        let resolver = DirectUrlResolver::default();
        assert!(resolver.is_valid_url("https://cdn.example/song.mp3"));
        assert!(resolver.is_valid_url("http://radio.example:8000/stream"));
        assert!(!resolver.is_valid_url("ftp://files.example/song.mp3"));
        assert!(!resolver.is_valid_url("daft punk one more time"));
    }

    #[tokio::test]
    async fn test_title_is_last_path_segment() {
        let resolver = DirectUrlResolver::new();
        let channel = ChannelId::new(5);

        let track = resolver
            .resolve("https://cdn.example/albums/track01.ogg", channel)
            .await
            .unwrap();
        assert_eq!(track.title(), "track01.ogg");
        assert_eq!(track.requested_by(), channel);

        let bare = resolver.resolve("https://radio.example/", channel).await.unwrap();
        assert_eq!(bare.title(), "radio.example");
    }
}
