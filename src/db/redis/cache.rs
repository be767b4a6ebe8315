use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Assembled menu document of one tenant
    Menu(String),
    /// The global tag catalog
    TagCatalog,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Menu(tenant_id) => write!(f, "menu:{}", tenant_id),
            CacheKey::TagCatalog => write!(f, "tags"),
        }
    }
}

impl CacheKey {
    /// Redis key of the counter bumped on every invalidation
    fn generation_key(&self) -> String {
        format!("{}:gen", self)
    }

    /// Redis key holding the value written under `generation`
    fn entry_key(&self, generation: u64) -> String {
        format!("{}@{}", self, generation)
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

/// Cache handler for storing and retrieving data from Redis
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
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task and waits for it to flush
    /// all pending writes to Redis.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// This spawns a background task that processes cache writes asynchronously,
    /// preventing cache operations from blocking API responses.
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

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
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
        let mut pending_writes = 0;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    pending_writes += 1;
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    } else {
                        pending_writes -= 1;
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(pending = pending_writes, "Cache writer shutting down, flushing remaining writes");

                    write_rx.close();
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

    /// Current generation of a key. Starts at 0 and only grows.
    pub async fn generation(&self, key: &CacheKey) -> AppResult<u64> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let generation: Option<u64> = conn.get(key.generation_key()).await?;
        Ok(generation.unwrap_or(0))
    }

    /// Retrieves the value stored for `key` under `generation`
    ///
    /// If the entry exists, the value is deserialized and returned.
    /// Entries written under an older generation are never returned.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
        generation: u64,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.entry_key(generation)).await?;

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

    /// Stores a value in the cache asynchronously without blocking
    ///
    /// The value is serialized here and handed to the background writer, so
    /// this returns before Redis has acknowledged anything. `generation` must
    /// be the one read before the value was computed; a write that lands
    /// after an invalidation goes to a key nobody reads any more.
    pub fn set_in_background<T: serde::Serialize>(
        &self,
        key: &CacheKey,
        generation: u64,
        value: &T,
        ttl: u64,
    ) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.entry_key(generation),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }

    /// Moves the key to a new generation and drops the previous entry
    pub async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let generation: u64 = conn.incr(key.generation_key(), 1u64).await?;
        let removed: u64 = conn.del(key.entry_key(generation - 1)).await?;
        tracing::debug!(key = %key, generation, removed, "Cache entry invalidated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[test]
    fn test_cache_key_display_menu() {
        let key = CacheKey::Menu("palate".to_string());
        assert_eq!(format!("{}", key), "menu:palate");
    }

    #[test]
    fn test_cache_key_display_tag_catalog() {
        assert_eq!(CacheKey::TagCatalog.to_string(), "tags");
    }

    #[test]
    fn test_entry_keys_carry_generation() {
        let key = CacheKey::Menu("palate".to_string());
        assert_eq!(key.generation_key(), "menu:palate:gen");
        assert_eq!(key.entry_key(3), "menu:palate@3");
        assert_eq!(CacheKey::TagCatalog.entry_key(0), "tags@0");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::Menu("nonexistent_tenant_12345".to_string());
        let generation = cache.generation(&key).await.unwrap();
        let retrieved: Option<Vec<String>> =
            cache.get_from_cache(&key, generation).await.unwrap();

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_then_invalidate() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::Menu("test_invalidate".to_string());
        let value = vec!["Starters".to_string()];

        let generation = cache.generation(&key).await.unwrap();
        cache.set_in_background(&key, generation, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> =
            cache.get_from_cache(&key, generation).await.unwrap();
        assert_eq!(retrieved, Some(value));

        cache.invalidate(&key).await.unwrap();
        let generation = cache.generation(&key).await.unwrap();
        let retrieved: Option<Vec<String>> =
            cache.get_from_cache(&key, generation).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_write_queued_before_invalidation_is_never_served() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::Menu(format!("test_stale_{}", uuid::Uuid::new_v4()));
        let stale = vec!["Old Starters".to_string()];

        // Reader computed its value, then a save committed and invalidated
        let read_generation = cache.generation(&key).await.unwrap();
        cache.invalidate(&key).await.unwrap();
        cache.set_in_background(&key, read_generation, &stale, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let current = cache.generation(&key).await.unwrap();
        assert_eq!(current, read_generation + 1);
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key, current).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_writer_graceful_shutdown() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = Cache::new(client.clone()).await;

        let key = CacheKey::Menu("test_shutdown".to_string());
        let value = vec!["shutdown_test".to_string()];

        let generation = cache.generation(&key).await.unwrap();
        cache.set_in_background(&key, generation, &value, 60);
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let retrieved: Option<Vec<String>> =
            cache.get_from_cache(&key, generation).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.entry_key(generation)).await.unwrap();
    }
}
