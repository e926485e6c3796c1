/// Spotify Web API catalog
///
/// Authenticates with the client-credentials grant and resolves songs through
/// the track search endpoint.
///
/// API Flow:
/// 1. Token: POST {token_url} with Basic auth → bearer token + lifetime
/// 2. Search: GET {api_url}/search?q=track:{name} artist:{artists}&type=track&limit=1
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{header, Client as HttpClient, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{EnrichedTrack, SpotifySearchResponse, SpotifyTokenResponse},
    services::providers::{sanitize_artists, CatalogProvider},
};

/// Tokens this close to expiry are exchanged again before use
const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn from_response(response: SpotifyTokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            value: response.access_token,
            expires_at: response
                .expires_in
                .map(|secs| now + ChronoDuration::seconds(secs)),
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + ChronoDuration::seconds(TOKEN_EXPIRY_SKEW_SECS) < expires_at,
            None => true,
        }
    }
}

#[derive(Debug)]
enum TokenState {
    Unfetched,
    Valid(AccessToken),
    /// A failed exchange disables the catalog for the rest of the process
    Failed(String),
}

pub struct SpotifyCatalog {
    http_client: HttpClient,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_url: String,
    token: Mutex<TokenState>,
}

impl SpotifyCatalog {
    pub fn new(
        client_id: String,
        client_secret: String,
        token_url: String,
        api_url: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            client_id,
            client_secret,
            token_url,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: Mutex::new(TokenState::Unfetched),
        })
    }

    /// Returns a bearer token, exchanging credentials when none is fresh
    async fn bearer(&self) -> AppResult<String> {
        let mut state = self.token.lock().await;
        let now = Utc::now();

        match &*state {
            TokenState::Valid(token) if token.is_fresh(now) => return Ok(token.value.clone()),
            TokenState::Failed(reason) => return Err(AppError::AuthFailure(reason.clone())),
            TokenState::Valid(_) => tracing::debug!("Spotify token expired, exchanging again"),
            TokenState::Unfetched => {}
        }

        match self.exchange_token().await {
            Ok(response) => {
                let token = AccessToken::from_response(response, now);
                tracing::info!(
                    expires_at = ?token.expires_at,
                    provider = "spotify",
                    "Obtained catalog access token"
                );
                let value = token.value.clone();
                *state = TokenState::Valid(token);
                Ok(value)
            }
            Err(reason) => {
                tracing::error!(
                    error = %reason,
                    provider = "spotify",
                    "Catalog authentication failed, recommendations disabled"
                );
                *state = TokenState::Failed(reason.clone());
                Err(AppError::AuthFailure(reason))
            }
        }
    }

    async fn exchange_token(&self) -> Result<SpotifyTokenResponse, String> {
        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| format!("Error authenticating with Spotify API: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!(
                "Spotify token endpoint returned status {}: {}. Check SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET",
                status, body
            ));
        }

        response
            .json::<SpotifyTokenResponse>()
            .await
            .map_err(|e| format!("Failed to parse Spotify token response: {}", e))
    }

    /// Drops a token the API rejected so the next call exchanges again
    async fn invalidate(&self) {
        let mut state = self.token.lock().await;
        if let TokenState::Valid(_) = &*state {
            *state = TokenState::Unfetched;
        }
    }
}

/// Field-qualified search query for one song
pub fn search_query(track_name: &str, artist_name: &str) -> String {
    format!("track:{} artist:{}", track_name, artist_name)
}

#[async_trait::async_trait]
impl CatalogProvider for SpotifyCatalog {
    async fn authenticate(&self) -> AppResult<()> {
        self.bearer().await.map(|_| ())
    }

    async fn lookup(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> AppResult<Option<EnrichedTrack>> {
        let bearer = self.bearer().await?;
        let artist = sanitize_artists(artist_name);
        let query = search_query(track_name, &artist);

        let response = self
            .http_client
            .get(format!("{}/search", self.api_url))
            .bearer_auth(&bearer)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "1")])
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.invalidate().await;
            return Err(AppError::AuthFailure(
                "Spotify rejected the access token".to_string(),
            ));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!(
                "Spotify API returned status {}: {}",
                status, body
            )));
        }

        let search: SpotifySearchResponse = response.json().await?;

        let Some(track) = search.into_first_track() else {
            tracing::warn!(
                track = %track_name,
                artist = %artist,
                provider = "spotify",
                "No catalog match"
            );
            return Ok(None);
        };

        match EnrichedTrack::try_from(track) {
            Ok(enriched) => {
                tracing::debug!(
                    track = %track_name,
                    artist = %artist,
                    provider = "spotify",
                    "Catalog lookup completed"
                );
                Ok(Some(enriched))
            }
            Err(reason) => {
                tracing::warn!(
                    track = %track_name,
                    artist = %artist,
                    reason = %reason,
                    provider = "spotify",
                    "Incomplete catalog match"
                );
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
