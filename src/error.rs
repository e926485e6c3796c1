use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::ClusterId;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Catalog authentication failed: {0}")]
    AuthFailure(String),

    #[error("Cluster {cluster} has {available} songs but {requested} were requested")]
    InsufficientCandidates {
        cluster: ClusterId,
        requested: usize,
        available: usize,
    },

    #[error("Could not find exact details for: '{track}' by '{artist}'")]
    LookupNotFound { track: String, artist: String },

    #[error("Catalog transport error: {0}")]
    Transport(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

impl AppError {
    /// Stable machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration_error",
            AppError::ResourceUnavailable(_) => "resource_unavailable",
            AppError::AuthFailure(_) => "auth_failure",
            AppError::InsufficientCandidates { .. } => "insufficient_candidates",
            AppError::LookupNotFound { .. } => "lookup_not_found",
            AppError::Transport(_) => "transport_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Cache(_) => "cache_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::LookupNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InsufficientCandidates { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ResourceUnavailable(_) | AppError::AuthFailure(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "Request rejected");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_candidates_message() {
        let err = AppError::InsufficientCandidates {
            cluster: ClusterId(4),
            requested: 10,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Cluster 4 has 3 songs but 10 were requested"
        );
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_lookup_not_found_message() {
        let err = AppError::LookupNotFound {
            track: "Jumpman".to_string(),
            artist: "Drake, Future".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not find exact details for: 'Jumpman' by 'Drake, Future'"
        );
        assert_eq!(err.kind(), "lookup_not_found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::ResourceUnavailable("model".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::AuthFailure("401".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Transport("timeout".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::InvalidInput("energy".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Configuration("SPOTIFY_CLIENT_ID".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
