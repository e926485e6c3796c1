use redis::AsyncCommands;
use redis::Client;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::ClusterId;

/// Content address of a cached value
///
/// A recommendation is a pure function of the dataset contents, the predicted
/// cluster, the sample size and the sampling seed, so those four values are the
/// whole key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommendation {
        dataset: u64,
        cluster: ClusterId,
        count: usize,
        seed: u64,
    },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendation {
                dataset,
                cluster,
                count,
                seed,
            } => write!(f, "recs:{:016x}:{}:{}:{}", dataset, cluster, count, seed),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

#[derive(Clone)]
enum Backend {
    /// Process-local map; entries live until the process exits
    Memory(Arc<RwLock<HashMap<String, String>>>),
    /// Shared Redis store; entries expire after their TTL
    Redis {
        client: Client,
        write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
    },
}

/// Cache handler for storing and retrieving serialized results
#[derive(Clone)]
pub struct Cache {
    backend: Backend,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task, which flushes all pending
    /// writes to Redis before exiting.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates an unbounded in-memory cache
    ///
    /// Nothing is ever evicted. The number of distinct keys is bounded by
    /// clusters and sample sizes, and the map is dropped with the process.
    /// Callers must not store results that depend on a transient failure.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(HashMap::new()))),
        }
    }

    /// Creates a Redis-backed cache with an async write background task
    ///
    /// Writes go through a channel to a spawned task so cache stores never
    /// block a response.
    pub async fn redis(client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer_client = client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(writer_client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            backend: Backend::Redis { client, write_tx },
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    /// Name of the active backend, for logging
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Redis { .. } => "redis",
        }
    }

    /// Background task that processes cache write messages
    ///
    /// On shutdown signal, flushes all remaining messages before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    // The sender lives inside every Cache clone, so drain what
                    // is queued instead of waiting for the channel to close.
                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes a single message to Redis
    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    async fn read_from_redis(client: &Client, key: &str) -> AppResult<Option<String>> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    fn read_from_memory(
        map: &RwLock<HashMap<String, String>>,
        key: &str,
    ) -> AppResult<Option<String>> {
        let entries = map
            .read()
            .map_err(|_| AppError::Internal("Cache lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` on a miss. A Redis outage is logged and treated as a miss
    /// so recommendations keep working without the shared cache.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let key = format!("{}", key);

        let cached = match &self.backend {
            Backend::Memory(map) => Self::read_from_memory(map, &key)?,
            Backend::Redis { client, .. } => match Self::read_from_redis(client, &key).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Redis read failed, treating as miss");
                    None
                }
            },
        };

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                tracing::debug!(key = %key, "Cache hit");
                Ok(Some(data))
            }
            None => {
                tracing::debug!(key = %key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Stores a value in the cache without blocking
    ///
    /// `ttl` (seconds) applies to the Redis backend only; memory entries are
    /// kept for the session.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        match &self.backend {
            Backend::Memory(map) => match map.write() {
                Ok(mut entries) => {
                    entries.insert(format!("{}", key), json);
                }
                Err(_) => tracing::error!("Cache lock poisoned, dropping write"),
            },
            Backend::Redis { write_tx, .. } => {
                let msg = CacheWriteMessage {
                    key: format!("{}", key),
                    value: json,
                    ttl,
                };

                if let Err(e) = write_tx.send(msg) {
                    tracing::error!(error = %e, "Failed to send cache write message");
                }
            }
        }
    }

    /// Number of entries held in memory (always 0 for Redis)
    pub fn local_len(&self) -> usize {
        match &self.backend {
            Backend::Memory(map) => map.read().map(|entries| entries.len()).unwrap_or(0),
            Backend::Redis { .. } => 0,
        }
    }
}
