use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::RequestId;
use crate::models::{ClusterId, EnrichedTrack, FeatureSpec, FeatureVector, SkippedTrack, FEATURES};
use crate::services::MAX_RECOMMENDATIONS;

use super::AppState;

const EMPTY_RESULT_MESSAGE: &str =
    "No recommendations found. Please try again with different preferences.";

// Request/Response types

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub recommendations: String,
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<FeatureSpec>,
    pub default_count: usize,
    pub max_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub loudness: f64,
    pub energy: f64,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub cluster: ClusterId,
    pub tracks: Vec<EnrichedTrack>,
    pub warnings: Vec<SkippedTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// Handlers

/// Liveness plus whether the recommendation path can serve requests
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let recommendations = if state.engine.is_available() {
        "available"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        recommendations: recommendations.to_string(),
    })
}

/// Describes the four input controls
pub async fn get_features(State(state): State<AppState>) -> Json<FeaturesResponse> {
    Json(FeaturesResponse {
        features: FEATURES.to_vec(),
        default_count: state.default_count,
        max_count: MAX_RECOMMENDATIONS,
    })
}

pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> AppResult<Json<RecommendResponse>> {
    // Malformed bodies share the error envelope instead of axum's plain text
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(request_id = %request_id, error = %rejection, "Rejected request body");
        AppError::InvalidInput(rejection.body_text())
    })?;

    let features = FeatureVector::new(
        request.acousticness,
        request.instrumentalness,
        request.loudness,
        request.energy,
    )?;
    let count = request.count.unwrap_or(state.default_count);

    tracing::info!(request_id = %request_id, count = count, "Recommendation requested");

    let recommendations = state.engine.recommend(&features, count).await?;

    let message = recommendations
        .tracks
        .is_empty()
        .then(|| EMPTY_RESULT_MESSAGE.to_string());

    Ok(Json(RecommendResponse {
        cluster: recommendations.cluster,
        tracks: recommendations.tracks,
        warnings: recommendations.skipped,
        message,
    }))
}
