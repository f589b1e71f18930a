use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full catalog listing, newest first
    Videos,
    Categories,
    Video(Uuid),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Videos => write!(f, "catalog:videos"),
            CacheKey::Categories => write!(f, "catalog:categories"),
            CacheKey::Video(id) => write!(f, "catalog:video:{}", id),
        }
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
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

/// Cache handler for storing and retrieving catalog data from Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Sends a shutdown signal to the writer task, which flushes pending writes
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// Writes go through a channel so catalog responses never wait on Redis.
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx })
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
                    write_rx.close();
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    while let Some(msg) = write_rx.recv().await {
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

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` on a miss. Deserialization failures surface as
    /// `AppError::Internal`.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Stores a value in the cache without waiting for the write
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_videos() {
        assert_eq!(CacheKey::Videos.to_string(), "catalog:videos");
    }

    #[test]
    fn test_cache_key_display_categories() {
        assert_eq!(CacheKey::Categories.to_string(), "catalog:categories");
    }

    #[test]
    fn test_cache_key_display_single_video() {
        let id = Uuid::parse_str("36fba147-20e3-5425-8a4d-d5b27949ae14").unwrap();
        assert_eq!(
            CacheKey::Video(id).to_string(),
            "catalog:video:36fba147-20e3-5425-8a4d-d5b27949ae14"
        );
    }

    #[test]
    fn test_create_redis_client_rejects_bad_url() {
        assert!(create_redis_client("not a url").is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_in_background_writes_to_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = Cache::new(client.clone()).await;

        let key = CacheKey::Video(Uuid::new_v4());
        let value = vec!["GST Fundamentals".to_string()];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
