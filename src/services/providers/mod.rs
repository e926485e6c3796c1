/// Music catalog abstraction
///
/// Recommendations are enriched by looking each sampled song up in an external
/// catalog. The engine only talks to this trait, so the Spotify client can be
/// swapped for a fake in tests.
use crate::{error::AppResult, models::EnrichedTrack};

pub mod spotify;

pub use spotify::SpotifyCatalog;

/// Trait for music catalogs that can resolve a (track, artist) pair
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Makes sure the provider holds a usable credential
    ///
    /// Returns `AuthFailure` when no credential can be obtained. Repeated
    /// calls after a failure keep failing without contacting the catalog.
    async fn authenticate(&self) -> AppResult<()>;

    /// Looks up the best match for a song
    ///
    /// `Ok(None)` means the catalog answered but had no complete match.
    /// Transport problems are returned as errors so the caller can decide
    /// whether to skip the song.
    async fn lookup(&self, track_name: &str, artist_name: &str)
        -> AppResult<Option<EnrichedTrack>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Strips list punctuation and quotes from a stored artist credit
///
/// Dataset rows carry artists as a serialized list such as `['Drake', 'Future']`;
/// the catalog search wants `Drake, Future`.
pub fn sanitize_artists(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '\'' | '"' | '\u{2018}' | '\u{2019}' | '\u{201c}' | '\u{201d}'))
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_artist_list() {
        assert_eq!(sanitize_artists("['Drake', 'Future']"), "Drake, Future");
    }

    #[test]
    fn test_sanitize_single_artist() {
        assert_eq!(sanitize_artists("['Adele']"), "Adele");
        assert_eq!(sanitize_artists("Adele"), "Adele");
    }

    #[test]
    fn test_sanitize_curly_and_double_quotes() {
        assert_eq!(
            sanitize_artists("[\u{2018}Sia\u{2019}, \"Labrinth\"]"),
            "Sia, Labrinth"
        );
    }

    #[test]
    fn test_sanitize_empty_becomes_unknown() {
        assert_eq!(sanitize_artists(""), "unknown");
        assert_eq!(sanitize_artists("[]"), "unknown");
        assert_eq!(sanitize_artists("  [ '' ]  "), "unknown");
    }

    #[tokio::test]
    async fn test_mock_catalog_provider() {
        let mut mock = MockCatalogProvider::new();
        mock.expect_authenticate().returning(|| Ok(()));
        mock.expect_lookup()
            .withf(|track, artist| track == "Jumpman" && artist == "Drake, Future")
            .returning(|_, _| Ok(None));

        assert!(mock.authenticate().await.is_ok());
        assert_eq!(mock.lookup("Jumpman", "Drake, Future").await.unwrap(), None);
    }
}
