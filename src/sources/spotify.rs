use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serenity::model::id::ChannelId;
use tracing::{debug, error, info};

use super::{censor::censor_text, ResolveError, TrackResolver};
use crate::audio::{track::SEARCH_SCHEME, Track};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// Margen antes de la expiración real del token
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Cliente de búsqueda de Spotify (flujo client credentials)
pub struct SpotifyClient {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    youtube_fallback: bool,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        http: reqwest::Client,
        youtube_fallback: bool,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            http,
            youtube_fallback,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, ResolveError> {
        let cached = self
            .token
            .lock()
            .clone()
            .filter(|token| token.expires_at > Utc::now());
        if let Some(token) = cached {
            return Ok(token.value);
        }

        debug!("🔑 Solicitando token de Spotify");
        let credentials = BASE64_STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .http
            .post(TOKEN_URL)
            .header(AUTHORIZATION, format!("Basic {credentials}"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("❌ Spotify rechazó las credenciales: {} - {}", status, error_text);
            return Err(ResolveError::Auth(format!("{status}: {error_text}")));
        }

        let token: TokenResponse = response.json().await?;
        let expires_at =
            Utc::now() + Duration::seconds((token.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0));
        *self.token.lock() = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    fn track_from(
        &self,
        item: SpotifyTrack,
        query: &str,
        requested_by: ChannelId,
    ) -> Result<Track, ResolveError> {
        let display_name = match item.artists.first() {
            Some(artist) => format!("{} - {}", item.name, artist.name),
            None => item.name,
        };

        let playable_url = match item.preview_url {
            Some(preview) => preview,
            None if self.youtube_fallback => format!("{SEARCH_SCHEME}{display_name}"),
            None => {
                debug!("Sin preview para {} y fallback desactivado", display_name);
                return Err(ResolveError::NotFound(query.to_string()));
            }
        };

        Ok(Track::new(censor_text(&display_name), playable_url, requested_by))
    }
}

#[async_trait]
impl TrackResolver for SpotifyClient {
    async fn resolve(&self, query: &str, requested_by: ChannelId) -> Result<Track, ResolveError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(SEARCH_URL)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            *self.token.lock() = None;
            return Err(ResolveError::Auth("access token rejected".to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("❌ Spotify API error: {} - {}", status, error_text);
            return Err(ResolveError::InvalidResponse(format!("{status}: {error_text}")));
        }

        let body: SearchResponse = response.json().await?;
        let item = body
            .tracks
            .and_then(|paging| paging.items.into_iter().next())
            .ok_or_else(|| ResolveError::NotFound(query.to_string()))?;

        let track = self.track_from(item, query, requested_by)?;
        info!("✅ Spotify: {}", track.title());
        Ok(track)
    }

    fn source_name(&self) -> &'static str {
        "spotify"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::PlayableSource;

    fn client(youtube_fallback: bool) -> SpotifyClient {
        SpotifyClient::new(
            "id".to_string(),
            "secret".to_string(),
            reqwest::Client::new(),
            youtube_fallback,
        )
    }

    fn first_item(json: &str) -> SpotifyTrack {
        let body: SearchResponse = serde_json::from_str(json).unwrap();
        body.tracks.unwrap().items.into_iter().next().unwrap()
    }

    const WITH_PREVIEW: &str = r#"{
        "tracks": { "items": [{
            "name": "Shit Song",
            "artists": [{ "name": "The Band" }, { "name": "Guest" }],
            "preview_url": "https://p.scdn.co/mp3-preview/abc",
            "external_urls": { "spotify": "https://open.spotify.com/track/1" }
        }]}
    }"#;

    const WITHOUT_PREVIEW: &str = r#"{
        "tracks": { "items": [{
            "name": "One More Time",
            "artists": [{ "name": "Daft Punk" }],
            "preview_url": null
        }]}
    }"#;

    #[test]
    fn test_preview_url_is_played_directly() {
        let track = client(true)
            .track_from(first_item(WITH_PREVIEW), "q", ChannelId::new(3))
            .unwrap();

        assert_eq!(track.title(), "S*** Song - The Band");
        assert_eq!(
            track.source(),
            PlayableSource::Direct("https://p.scdn.co/mp3-preview/abc")
        );
    }

    #[test]
    fn test_missing_preview_falls_back_to_search() {
        let track = client(true)
            .track_from(first_item(WITHOUT_PREVIEW), "q", ChannelId::new(3))
            .unwrap();

        assert_eq!(track.source(), PlayableSource::Search("One More Time - Daft Punk"));
    }

    #[test]
    fn test_missing_preview_without_fallback_is_not_found() {
        let result = client(false).track_from(first_item(WITHOUT_PREVIEW), "daft", ChannelId::new(3));
        assert!(matches!(result, Err(ResolveError::NotFound(q)) if q == "daft"));
    }

    #[test]
    fn test_empty_search_parses() {
        let body: SearchResponse = serde_json::from_str(r#"{"tracks": {"items": []}}"#).unwrap();
        assert!(body.tracks.unwrap().items.is_empty());
    }
}
