/// Cluster model
///
/// Runtime side of the pre-trained clustering artifact. The model is loaded once
/// and only ever asked to predict; training happens elsewhere.
///
/// Artifact format (JSON):
/// ```json
/// {
///   "features": ["acousticness", "instrumentalness", "loudness", "energy"],
///   "scaler": { "mean": [0.3, 0.1, -9.0, 0.6], "scale": [0.3, 0.2, 5.0, 0.2] },
///   "centroids": [[...], [...]],
///   "labels": [0, 1]
/// }
/// ```
/// `scaler` and `labels` are optional. `features` may list the four names in
/// any order; centroids and scaler values follow that order.
use serde::Deserialize;
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::{ClusterId, FeatureVector, FEATURES},
};

/// Maps a feature vector to a cluster
#[cfg_attr(test, mockall::automock)]
pub trait ClusterPredictor: Send + Sync {
    /// Deterministic for a given loaded model and input
    fn predict(&self, features: &FeatureVector) -> ClusterId;

    /// Every cluster this model can return
    fn clusters(&self) -> Vec<ClusterId>;
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    features: Vec<String>,
    #[serde(default)]
    scaler: Option<ScalerArtifact>,
    centroids: Vec<Vec<f64>>,
    #[serde(default)]
    labels: Option<Vec<u32>>,
}

#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Standardisation applied before distance computation
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; 4],
    scale: [f64; 4],
}

impl StandardScaler {
    pub fn new(mean: [f64; 4], scale: [f64; 4]) -> AppResult<Self> {
        if mean.iter().any(|m| !m.is_finite()) {
            return Err(AppError::ResourceUnavailable(
                "Model scaler mean must be finite".to_string(),
            ));
        }
        if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(AppError::ResourceUnavailable(
                "Model scaler scale must be finite and non-zero".to_string(),
            ));
        }
        Ok(Self { mean, scale })
    }

    fn transform(&self, values: [f64; 4]) -> [f64; 4] {
        let mut out = values;
        for i in 0..4 {
            out[i] = (values[i] - self.mean[i]) / self.scale[i];
        }
        out
    }
}

/// Nearest-centroid predictor
///
/// Centroids and scaler are stored in canonical feature order regardless of the
/// order used by the artifact.
#[derive(Debug, Clone)]
pub struct KMeansModel {
    centroids: Vec<[f64; 4]>,
    labels: Vec<ClusterId>,
    scaler: Option<StandardScaler>,
}

impl KMeansModel {
    /// Builds a model from canonical-order centroids; labels default to the index
    pub fn new(
        centroids: Vec<[f64; 4]>,
        labels: Option<Vec<ClusterId>>,
        scaler: Option<StandardScaler>,
    ) -> AppResult<Self> {
        if centroids.is_empty() {
            return Err(AppError::ResourceUnavailable(
                "Model has no centroids".to_string(),
            ));
        }

        if centroids.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AppError::ResourceUnavailable(
                "Model centroids must be finite".to_string(),
            ));
        }

        let labels = match labels {
            Some(labels) if labels.len() != centroids.len() => {
                return Err(AppError::ResourceUnavailable(format!(
                    "Model has {} centroids but {} labels",
                    centroids.len(),
                    labels.len()
                )));
            }
            Some(labels) => labels,
            None => (0..centroids.len() as u32).map(ClusterId).collect(),
        };

        Ok(Self {
            centroids,
            labels,
            scaler,
        })
    }

    /// Loads the JSON artifact at `path`
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ResourceUnavailable(format!(
                "A required file was not found: {}: {}",
                path.display(),
                e
            ))
        })?;

        let model = Self::from_json(&raw).map_err(|e| match e {
            AppError::ResourceUnavailable(msg) => AppError::ResourceUnavailable(format!(
                "Model {} is invalid: {}",
                path.display(),
                msg
            )),
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            clusters = model.centroids.len(),
            scaled = model.scaler.is_some(),
            "Loaded cluster model"
        );

        Ok(model)
    }

    /// Parses an artifact, reordering its columns into canonical order
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let artifact: ModelArtifact = serde_json::from_str(raw)
            .map_err(|e| AppError::ResourceUnavailable(format!("parse error: {}", e)))?;

        let order = canonical_order(&artifact.features)?;

        let centroids = artifact
            .centroids
            .iter()
            .enumerate()
            .map(|(i, centroid)| {
                reorder(centroid, &order).map_err(|len| {
                    AppError::ResourceUnavailable(format!(
                        "centroid {} has {} values, expected 4",
                        i, len
                    ))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let scaler = match artifact.scaler {
            Some(scaler) => {
                let mean = reorder(&scaler.mean, &order).map_err(|len| {
                    AppError::ResourceUnavailable(format!(
                        "scaler mean has {} values, expected 4",
                        len
                    ))
                })?;
                let scale = reorder(&scaler.scale, &order).map_err(|len| {
                    AppError::ResourceUnavailable(format!(
                        "scaler scale has {} values, expected 4",
                        len
                    ))
                })?;
                Some(StandardScaler::new(mean, scale)?)
            }
            None => None,
        };

        let labels = artifact
            .labels
            .map(|labels| labels.into_iter().map(ClusterId).collect());

        Self::new(centroids, labels, scaler)
    }

    fn squared_distance(a: &[f64; 4], b: &[f64; 4]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

impl ClusterPredictor for KMeansModel {
    fn predict(&self, features: &FeatureVector) -> ClusterId {
        let point = match &self.scaler {
            Some(scaler) => scaler.transform(features.as_array()),
            None => features.as_array(),
        };

        // Strict `<` keeps the lowest index on ties.
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, centroid) in self.centroids.iter().enumerate() {
            let distance = Self::squared_distance(&point, centroid);
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }

        self.labels[best]
    }

    fn clusters(&self) -> Vec<ClusterId> {
        let mut clusters = self.labels.clone();
        clusters.sort();
        clusters.dedup();
        clusters
    }
}

/// For each canonical feature, the column index it has in the artifact
fn canonical_order(names: &[String]) -> AppResult<[usize; 4]> {
    if names.len() != FEATURES.len() {
        return Err(AppError::ResourceUnavailable(format!(
            "expected {} features, got {}",
            FEATURES.len(),
            names.len()
        )));
    }

    let mut order = [0usize; 4];
    for (slot, spec) in order.iter_mut().zip(FEATURES.iter()) {
        let mut matches = names.iter().enumerate().filter(|(_, n)| *n == spec.name);
        *slot = match (matches.next(), matches.next()) {
            (Some((i, _)), None) => i,
            (None, _) => {
                return Err(AppError::ResourceUnavailable(format!(
                    "feature '{}' is missing",
                    spec.name
                )))
            }
            (Some(_), Some(_)) => {
                return Err(AppError::ResourceUnavailable(format!(
                    "feature '{}' is listed twice",
                    spec.name
                )))
            }
        };
    }

    Ok(order)
}

/// Picks `values` into canonical order; returns the actual length on mismatch
fn reorder(values: &[f64], order: &[usize; 4]) -> Result<[f64; 4], usize> {
    if values.len() != 4 {
        return Err(values.len());
    }
    Ok(order.map(|i| values[i]))
}
