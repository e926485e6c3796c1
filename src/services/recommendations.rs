use std::path::Path;
use std::sync::Arc;

use crate::{
    db::{Cache, CacheKey, CatalogDataset},
    error::{AppError, AppResult},
    models::{CatalogEntry, ClusterId, FeatureVector, Recommendations, SkippedTrack},
    services::{
        cluster_model::{ClusterPredictor, KMeansModel},
        providers::{sanitize_artists, CatalogProvider},
    },
};

/// Upper bound on songs per request
pub const MAX_RECOMMENDATIONS: usize = 50;

/// Model and dataset, loaded together at startup
#[derive(Clone)]
pub struct Resources {
    pub model: Arc<dyn ClusterPredictor>,
    pub dataset: Arc<CatalogDataset>,
    /// Clusters the model can predict that have no songs
    empty_clusters: Vec<ClusterId>,
    /// Dataset clusters the model never predicts
    unreachable_clusters: Vec<ClusterId>,
}

impl Resources {
    /// Pairs a model with a dataset, recording clusters they disagree on
    ///
    /// Mismatches are logged and kept, never fatal: requests predicting an
    /// empty cluster fail later with `InsufficientCandidates`.
    pub fn new(model: Arc<dyn ClusterPredictor>, dataset: Arc<CatalogDataset>) -> Self {
        let model_clusters = model.clusters();

        let mut empty_clusters: Vec<ClusterId> = model_clusters
            .iter()
            .copied()
            .filter(|cluster| !dataset.contains_cluster(*cluster))
            .collect();
        empty_clusters.sort();

        let unreachable_clusters: Vec<ClusterId> = dataset
            .cluster_sizes()
            .into_keys()
            .filter(|cluster| !model_clusters.contains(cluster))
            .collect();

        for cluster in &empty_clusters {
            tracing::warn!(
                cluster = %cluster,
                "Model cluster has no songs in the dataset; requests predicting it will fail"
            );
        }

        for cluster in &unreachable_clusters {
            tracing::warn!(
                cluster = %cluster,
                "Dataset cluster is never predicted by the model"
            );
        }

        Self {
            model,
            dataset,
            empty_clusters,
            unreachable_clusters,
        }
    }

    /// `(empty, unreachable)`: model clusters without songs, and dataset
    /// clusters the model never predicts, both sorted
    pub fn inconsistencies(&self) -> (&[ClusterId], &[ClusterId]) {
        (&self.empty_clusters, &self.unreachable_clusters)
    }

    /// Loads both artifacts from disk
    pub fn load(model_path: impl AsRef<Path>, dataset_path: impl AsRef<Path>) -> AppResult<Self> {
        let model = KMeansModel::load(model_path)?;
        let dataset = CatalogDataset::load(dataset_path)?;
        Ok(Self::new(Arc::new(model), Arc::new(dataset)))
    }
}

/// Turns a feature vector into enriched song recommendations
///
/// Pipeline: predict cluster → sample songs from it → look each one up in the
/// catalog. Results are cached per (dataset, cluster, count, seed), since the
/// sample only depends on those. Results with transport failures are not
/// cached.
pub struct RecommendationEngine {
    resources: Result<Resources, String>,
    catalog: Arc<dyn CatalogProvider>,
    cache: Cache,
    seed: u64,
    cache_ttl: u64,
}

impl RecommendationEngine {
    /// `resources` is `Err(reason)` when startup loading failed; the engine then
    /// answers every request with `ResourceUnavailable`.
    pub fn new(
        resources: Result<Resources, String>,
        catalog: Arc<dyn CatalogProvider>,
        cache: Cache,
        seed: u64,
        cache_ttl: u64,
    ) -> Self {
        Self {
            resources,
            catalog,
            cache,
            seed,
            cache_ttl,
        }
    }

    pub fn is_available(&self) -> bool {
        self.resources.is_ok()
    }

    /// Recommends `count` songs close to `features`
    ///
    /// Songs the catalog cannot resolve are reported in `skipped` instead of
    /// failing the request. An authentication failure aborts the whole batch.
    pub async fn recommend(
        &self,
        features: &FeatureVector,
        count: usize,
    ) -> AppResult<Recommendations> {
        let resources = self.resources.as_ref().map_err(|reason| {
            tracing::error!(reason = %reason, "Model or data failed to load");
            AppError::ResourceUnavailable(
                "Model or data failed to load. Cannot recommend songs.".to_string(),
            )
        })?;

        if count == 0 || count > MAX_RECOMMENDATIONS {
            return Err(AppError::InvalidInput(format!(
                "count must be between 1 and {}, got {}",
                MAX_RECOMMENDATIONS, count
            )));
        }

        self.catalog.authenticate().await?;

        let cluster = resources.model.predict(features);

        tracing::info!(
            cluster = %cluster,
            count = count,
            acousticness = features.acousticness(),
            instrumentalness = features.instrumentalness(),
            loudness = features.loudness(),
            energy = features.energy(),
            "Predicted cluster"
        );

        let dataset = &resources.dataset;
        let key = CacheKey::Recommendation {
            dataset: dataset.fingerprint(),
            cluster,
            count,
            seed: self.seed,
        };

        if let Some(cached) = self.cache.get_from_cache(&key).await? {
            return Ok(cached);
        }

        let sample = dataset.sample(cluster, count, self.seed)?;
        let (recommendations, transport_failures) = self.enrich(cluster, sample).await?;

        // A transport failure may clear up on the next request, so the result
        // is served but not remembered.
        if transport_failures == 0 {
            self.cache
                .set_in_background(&key, &recommendations, self.cache_ttl);
        } else {
            tracing::debug!(
                cluster = %cluster,
                transport_failures = transport_failures,
                "Not caching recommendations with transport failures"
            );
        }

        Ok(recommendations)
    }

    /// Looks up each sampled song in order
    ///
    /// Returns the result plus the number of songs dropped for transport
    /// errors. An authentication failure aborts the batch.
    async fn enrich(
        &self,
        cluster: ClusterId,
        sample: Vec<&CatalogEntry>,
    ) -> AppResult<(Recommendations, usize)> {
        let mut tracks = Vec::with_capacity(sample.len());
        let mut skipped = Vec::new();
        let mut transport_failures = 0;

        for entry in sample {
            match self.catalog.lookup(&entry.name, &entry.artists).await {
                Ok(Some(track)) => tracks.push(track),
                Ok(None) => {
                    let artist = sanitize_artists(&entry.artists);
                    let reason = AppError::LookupNotFound {
                        track: entry.name.clone(),
                        artist: artist.clone(),
                    };
                    tracing::warn!(track = %entry.name, artist = %artist, "{}", reason);
                    skipped.push(SkippedTrack {
                        name: entry.name.clone(),
                        artist,
                        reason: reason.to_string(),
                    });
                }
                Err(e @ AppError::AuthFailure(_)) => return Err(e),
                Err(e) => {
                    let artist = sanitize_artists(&entry.artists);
                    tracing::error!(
                        error = %e,
                        track = %entry.name,
                        artist = %artist,
                        provider = self.catalog.name(),
                        "Error searching for song details"
                    );
                    transport_failures += 1;
                    skipped.push(SkippedTrack {
                        name: entry.name.clone(),
                        artist,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            cluster = %cluster,
            enriched = tracks.len(),
            skipped = skipped.len(),
            "Recommendations built"
        );

        Ok((
            Recommendations {
                cluster,
                tracks,
                skipped,
            },
            transport_failures,
        ))
    }
}
