use std::sync::Arc;
use std::time::Duration;

use song_cluster_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache, CacheWriterHandle},
    services::{CatalogProvider, RecommendationEngine, Resources, SpotifyCatalog},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("song_cluster_api=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;

    let (cache, cache_writer) = build_cache(&config).await?;
    tracing::info!(backend = cache.backend_name(), "Recommendation cache ready");

    let catalog = SpotifyCatalog::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        config.spotify_token_url.clone(),
        config.spotify_api_url.clone(),
        Duration::from_secs(config.http_timeout_secs),
    )?;

    // The catalog remembers a failed exchange; recommendation requests then
    // answer with AuthFailure.
    if catalog.authenticate().await.is_err() {
        tracing::warn!("Starting without catalog access");
    }

    let resources = Resources::load(&config.model_path, &config.dataset_path).map_err(|e| {
        tracing::error!(error = %e, "Model or data failed to load");
        e.to_string()
    });

    let engine = RecommendationEngine::new(
        resources,
        Arc::new(catalog),
        cache,
        config.sample_seed,
        config.cache_ttl_secs,
    );

    let app = create_router(AppState::new(engine, config.sample_size));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// In-memory cache unless `REDIS_URL` is set
async fn build_cache(config: &Config) -> anyhow::Result<(Cache, Option<CacheWriterHandle>)> {
    match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url)?;
            let (cache, handle) = Cache::redis(client).await;
            Ok((cache, Some(handle)))
        }
        None => Ok((Cache::in_memory(), None)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
