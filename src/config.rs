use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::services::MAX_RECOMMENDATIONS;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Spotify application client ID
    pub spotify_client_id: String,

    /// Spotify application client secret
    pub spotify_client_secret: String,

    /// Client-credentials token endpoint
    #[serde(default = "default_spotify_token_url")]
    pub spotify_token_url: String,

    /// Spotify Web API base URL
    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    /// Serialized cluster model
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Serialized song dataset
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Number of songs recommended when the request does not say
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Seed for cluster sampling
    #[serde(default = "default_sample_seed")]
    pub sample_seed: u64,

    /// Redis connection URL; the in-memory cache is used when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Redis entry lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Timeout applied to every catalog HTTP call
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_spotify_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_model_path() -> String {
    "./models/cluster_model.json".to_string()
}

fn default_dataset_path() -> String {
    "./models/catalog.json".to_string()
}

fn default_sample_size() -> usize {
    10
}

fn default_sample_seed() -> u64 {
    42
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars).map_err(|e| match e {
            envy::Error::MissingValue(field) => AppError::Configuration(format!(
                "Missing Spotify credential '{}'. Set it in the environment or .env file.",
                field.to_uppercase()
            )),
            other => AppError::Configuration(format!("Failed to load config: {}", other)),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.spotify_client_id.trim().is_empty() {
            return Err(AppError::Configuration(
                "Missing Spotify credential 'SPOTIFY_CLIENT_ID'".to_string(),
            ));
        }
        if self.spotify_client_secret.trim().is_empty() {
            return Err(AppError::Configuration(
                "Missing Spotify credential 'SPOTIFY_CLIENT_SECRET'".to_string(),
            ));
        }
        if self.sample_size == 0 || self.sample_size > MAX_RECOMMENDATIONS {
            return Err(AppError::Configuration(format!(
                "SAMPLE_SIZE must be between 1 and {}",
                MAX_RECOMMENDATIONS
            )));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
