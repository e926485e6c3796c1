use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

mod features;
mod spotify;

pub use features::{FeatureSpec, FeatureVector, FEATURES};
pub use spotify::{
    SpotifyAlbum, SpotifyArtist, SpotifyExternalUrls, SpotifyImage, SpotifyPaging,
    SpotifySearchResponse, SpotifyTokenResponse, SpotifyTrack,
};

/// Label assigned by the cluster model
///
/// Only equality carries meaning; ordering exists so listings are stable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClusterId(pub u32);

impl Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the static song dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CatalogEntry {
    pub name: String,
    /// Artist credit, usually a serialized list such as `['Drake', 'Future']`
    #[serde(default, deserialize_with = "deserialize_artists")]
    pub artists: String,
    pub cluster: ClusterId,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, artists: impl Into<String>, cluster: ClusterId) -> Self {
        Self {
            name: name.into(),
            artists: artists.into(),
            cluster,
        }
    }
}

/// Accepts either a plain string or a JSON array of artist names
fn deserialize_artists<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ArtistsField {
        Text(String),
        List(Vec<String>),
    }

    Ok(match Option::<ArtistsField>::deserialize(deserializer)? {
        Some(ArtistsField::Text(text)) => text,
        Some(ArtistsField::List(names)) => names.join(", "),
        None => String::new(),
    })
}

/// Catalog metadata for one recommended song
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedTrack {
    pub name: String,
    /// Primary artist as reported by the catalog
    pub artist: String,
    pub album: String,
    pub album_art_url: String,
    pub preview_url: Option<String>,
    /// "Listen on Spotify" link
    pub external_url: String,
}

impl TryFrom<SpotifyTrack> for EnrichedTrack {
    type Error = String;

    fn try_from(track: SpotifyTrack) -> Result<Self, Self::Error> {
        let artist = track
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| "catalog result has no artist".to_string())?;

        let album_art_url = track
            .album
            .images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| "catalog result has no album art".to_string())?;

        let external_url = track
            .external_urls
            .spotify
            .ok_or_else(|| "catalog result has no external URL".to_string())?;

        if track.name.trim().is_empty() || track.album.name.trim().is_empty() {
            return Err("catalog result has an empty name or album".to_string());
        }

        Ok(EnrichedTrack {
            name: track.name,
            artist,
            album: track.album.name,
            album_art_url,
            preview_url: track.preview_url,
            external_url,
        })
    }
}

/// A sampled song that was dropped from the result, with the user-visible reason
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedTrack {
    pub name: String,
    pub artist: String,
    pub reason: String,
}

/// Outcome of one recommendation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendations {
    pub cluster: ClusterId,
    /// Enriched tracks in sampling order
    pub tracks: Vec<EnrichedTrack>,
    pub skipped: Vec<SkippedTrack>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spotify_track() -> SpotifyTrack {
        serde_json::from_value(serde_json::json!({
            "name": "Blinding Lights",
            "artists": [{"name": "The Weeknd"}],
            "album": {
                "name": "After Hours",
                "images": [{"url": "https://i.scdn.co/image/after-hours"}]
            },
            "preview_url": "https://p.scdn.co/mp3-preview/abc",
            "external_urls": {"spotify": "https://open.spotify.com/track/0VjIjW4GlUZAMYd2vXMi3b"}
        }))
        .unwrap()
    }

    #[test]
    fn test_cluster_id_display_and_serde() {
        let id = ClusterId(7);
        assert_eq!(format!("{}", id), "7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        assert_eq!(serde_json::from_str::<ClusterId>("7").unwrap(), id);
    }

    #[test]
    fn test_catalog_entry_with_string_artists() {
        let json = r#"{"name": "Jumpman", "artists": "['Drake', 'Future']", "cluster": 2, "energy": 0.55}"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.artists, "['Drake', 'Future']");
        assert_eq!(entry.cluster, ClusterId(2));
    }

    #[test]
    fn test_catalog_entry_with_list_artists() {
        let json = r#"{"name": "Jumpman", "artists": ["Drake", "Future"], "cluster": 2}"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.artists, "Drake, Future");
    }

    #[test]
    fn test_catalog_entry_without_artists() {
        let json = r#"{"name": "Untitled", "cluster": 0}"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.artists, "");

        let json = r#"{"name": "Untitled", "artists": null, "cluster": 0}"#;
        let entry: CatalogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.artists, "");
    }

    #[test]
    fn test_enriched_track_from_spotify_track() {
        let track = EnrichedTrack::try_from(spotify_track()).unwrap();
        assert_eq!(track.name, "Blinding Lights");
        assert_eq!(track.artist, "The Weeknd");
        assert_eq!(track.album, "After Hours");
        assert_eq!(track.album_art_url, "https://i.scdn.co/image/after-hours");
        assert_eq!(
            track.preview_url.as_deref(),
            Some("https://p.scdn.co/mp3-preview/abc")
        );
    }

    #[test]
    fn test_enriched_track_requires_album_art() {
        let mut track = spotify_track();
        track.album.images.clear();
        let err = EnrichedTrack::try_from(track).unwrap_err();
        assert!(err.contains("album art"));
    }

    #[test]
    fn test_enriched_track_requires_artist() {
        let mut track = spotify_track();
        track.artists.clear();
        assert!(EnrichedTrack::try_from(track).is_err());
    }

    #[test]
    fn test_enriched_track_requires_external_url() {
        let mut track = spotify_track();
        track.external_urls.spotify = None;
        assert!(EnrichedTrack::try_from(track).is_err());
    }
}
