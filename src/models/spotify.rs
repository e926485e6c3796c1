// ============================================================================
// Spotify Web API Types
// ============================================================================

use serde::Deserialize;

/// Response of the client-credentials token exchange
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// GET /v1/search?type=track response
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchResponse {
    #[serde(default)]
    pub tracks: Option<SpotifyPaging>,
}

impl SpotifySearchResponse {
    /// Consumes the response and returns the best match, if any
    pub fn into_first_track(self) -> Option<SpotifyTrack> {
        self.tracks.and_then(|page| page.items.into_iter().next())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPaging {
    #[serde(default)]
    pub items: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: SpotifyAlbum,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: SpotifyExternalUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_deserialization() {
        let json = r#"{
            "tracks": {
                "href": "https://api.spotify.com/v1/search?query=track%3AJumpman",
                "items": [{
                    "id": "27GmP9AWRs744SzKcpJsTZ",
                    "name": "Jumpman",
                    "artists": [{"name": "Drake"}, {"name": "Future"}],
                    "album": {
                        "name": "What A Time To Be Alive",
                        "images": [{"url": "https://i.scdn.co/image/abc", "width": 640, "height": 640}]
                    },
                    "preview_url": null,
                    "external_urls": {"spotify": "https://open.spotify.com/track/27GmP9AWRs744SzKcpJsTZ"}
                }],
                "limit": 1
            }
        }"#;

        let response: SpotifySearchResponse = serde_json::from_str(json).unwrap();
        let track = response.into_first_track().unwrap();
        assert_eq!(track.name, "Jumpman");
        assert_eq!(track.artists[0].name, "Drake");
        assert_eq!(track.album.images[0].url, "https://i.scdn.co/image/abc");
        assert_eq!(track.preview_url, None);
        assert_eq!(
            track.external_urls.spotify.as_deref(),
            Some("https://open.spotify.com/track/27GmP9AWRs744SzKcpJsTZ")
        );
    }

    #[test]
    fn test_search_response_without_items() {
        let response: SpotifySearchResponse =
            serde_json::from_str(r#"{"tracks": {"items": []}}"#).unwrap();
        assert!(response.into_first_track().is_none());

        let response: SpotifySearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_first_track().is_none());
    }

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{"access_token": "BQD", "token_type": "Bearer", "expires_in": 3600}"#;
        let token: SpotifyTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "BQD");
        assert_eq!(token.expires_in, Some(3600));
    }
}
