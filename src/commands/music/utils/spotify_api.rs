//! Spotify Web API lookups used to decorate the "now playing" card.
//!
//! Every call here is best-effort: a failure never aborts playback, it only
//! degrades the card (no token or no match means no card, no album art means
//! an empty thumbnail).

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::HTTP_CLIENT;
use crate::config::Config;

use super::music_manager::{MusicError, MusicResult};

/// Authentication tokens for Spotify API
#[derive(Debug, Serialize, Deserialize)]
struct SpotifyToken {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(skip, default = "Instant::now")]
    created_at: Instant,
}

impl SpotifyToken {
    fn is_expired(&self) -> bool {
        let expiry = Duration::from_secs(self.expires_in);
        let elapsed = self.created_at.elapsed();
        // Consider it expired 30 seconds before actual expiry
        elapsed > expiry.saturating_sub(Duration::from_secs(30))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: SearchTracks,
}

#[derive(Debug, Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    album: Album,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<AlbumImage>,
}

#[derive(Debug, Deserialize)]
struct AlbumImage {
    url: String,
}

/// Spotify API client using the client-credentials flow
pub struct SpotifyApi {
    client_id: String,
    client_secret: String,
    accounts_url: String,
    api_url: String,
    timeout: Duration,
    token: Mutex<Option<SpotifyToken>>,
}

impl SpotifyApi {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        accounts_url: impl Into<String>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            accounts_url: accounts_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            timeout,
            token: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.spotify_client_id,
            &config.spotify_client_secret,
            &config.spotify.accounts_url,
            &config.spotify.api_url,
            config.spotify.timeout,
        )
    }

    /// Per-request timeout, also applied to card image downloads
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get an access token, reusing the cached one while it is valid.
    /// Returns `None` on any failure.
    pub async fn access_token(&self) -> Option<String> {
        let mut token_lock = self.token.lock().await;

        if let Some(token) = &*token_lock {
            if !token.is_expired() {
                return Some(token.access_token.clone());
            }
        }

        match self.request_token().await {
            Ok(token) => {
                let access_token = token.access_token.clone();
                *token_lock = Some(token);
                Some(access_token)
            }
            Err(e) => {
                debug!("Error fetching Spotify token: {}", e);
                None
            }
        }
    }

    async fn request_token(&self) -> MusicResult<SpotifyToken> {
        // Basic auth with client_id:client_secret
        let auth = BASE64_STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));

        let params = [("grant_type", "client_credentials")];
        let response = HTTP_CLIENT
            .post(format!("{}/api/token", self.accounts_url))
            .header(header::AUTHORIZATION, format!("Basic {}", auth))
            .form(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                MusicError::ExternalApiError(format!("Failed to request Spotify token: {}", e))
            })?;

        let response = ensure_success(response).await?;

        response.json::<SpotifyToken>().await.map_err(|e| {
            MusicError::ExternalApiError(format!("Failed to parse Spotify token: {}", e))
        })
    }

    /// Search for a track by name and return the id of the best match.
    /// Returns `None` when nothing matched or the request failed.
    pub async fn search_track_id(&self, token: &str, song_name: &str) -> Option<String> {
        let result: MusicResult<SearchResponse> = async {
            let response = HTTP_CLIENT
                .get(format!("{}/v1/search", self.api_url))
                .query(&[("q", song_name), ("type", "track"), ("limit", "1")])
                .bearer_auth(token)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| {
                    MusicError::ExternalApiError(format!("Failed to search Spotify: {}", e))
                })?;

            ensure_success(response).await?.json().await.map_err(|e| {
                MusicError::ExternalApiError(format!("Failed to parse Spotify search: {}", e))
            })
        }
        .await;

        match result {
            Ok(search) => search.tracks.items.into_iter().next().map(|track| track.id),
            Err(e) => {
                debug!("Error fetching Spotify track ID: {}", e);
                None
            }
        }
    }

    /// URL of the first album image of a track, or an empty string.
    pub async fn album_thumbnail(&self, token: &str, track_id: &str) -> String {
        let result: MusicResult<TrackResponse> = async {
            let response = HTTP_CLIENT
                .get(format!("{}/v1/tracks/{}", self.api_url, track_id))
                .bearer_auth(token)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| {
                    MusicError::ExternalApiError(format!("Failed to request Spotify track: {}", e))
                })?;

            ensure_success(response).await?.json().await.map_err(|e| {
                MusicError::ExternalApiError(format!("Failed to parse Spotify track data: {}", e))
            })
        }
        .await;

        match result {
            Ok(track) => track
                .album
                .images
                .into_iter()
                .next()
                .map(|image| image.url)
                .unwrap_or_default(),
            Err(e) => {
                debug!("Error fetching Spotify track thumbnail: {}", e);
                String::new()
            }
        }
    }

    /// Token, search, then album art for the playing track.
    pub async fn now_playing_thumbnail(&self, song_name: &str) -> MusicResult<String> {
        let Some(token) = self.access_token().await else {
            warn!("No Spotify token available, skipping lookup for {}", song_name);
            return Err(MusicError::TrackNotFound(song_name.to_string()));
        };

        let track_id = self
            .search_track_id(&token, song_name)
            .await
            .ok_or_else(|| MusicError::TrackNotFound(song_name.to_string()))?;

        Ok(self.album_thumbnail(&token, &track_id).await)
    }
}

async fn ensure_success(response: reqwest::Response) -> MusicResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Cannot read response".to_string());
    Err(MusicError::ExternalApiError(format!(
        "Spotify API error: {} - {}",
        status, text
    )))
}
