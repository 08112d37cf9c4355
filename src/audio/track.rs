use chrono::{DateTime, Utc};
use serenity::model::id::ChannelId;

/// Pseudo-scheme marking a playable URL that yt-dlp still has to search for.
pub const SEARCH_SCHEME: &str = "ytsearch:";

/// A resolved, playable track. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    title: String,
    playable_url: String,
    requested_by: ChannelId,
    requested_at: DateTime<Utc>,
}

/// How the audio sink should open a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayableSource<'a> {
    /// Stream the URL over HTTP.
    Direct(&'a str),
    /// Let yt-dlp search for the query and stream the first hit.
    Search(&'a str),
}

impl Track {
    pub fn new(title: impl Into<String>, playable_url: impl Into<String>, requested_by: ChannelId) -> Self {
        Self {
            title: title.into(),
            playable_url: playable_url.into(),
            requested_by,
            requested_at: Utc::now(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn playable_url(&self) -> &str {
        &self.playable_url
    }

    /// Text channel that receives announcements for this track
    pub fn requested_by(&self) -> ChannelId {
        self.requested_by
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn source(&self) -> PlayableSource<'_> {
        match self.playable_url.strip_prefix(SEARCH_SCHEME) {
            Some(query) => PlayableSource::Search(query.trim()),
            None => PlayableSource::Direct(&self.playable_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_classification() {
        let channel = ChannelId::new(1);

        let direct = Track::new("A", "https://p.scdn.co/mp3-preview/abc", channel);
        assert_eq!(direct.source(), PlayableSource::Direct("https://p.scdn.co/mp3-preview/abc"));

        let search = Track::new("B", "ytsearch: Song - Artist", channel);
        assert_eq!(search.source(), PlayableSource::Search("Song - Artist"));
    }
}
