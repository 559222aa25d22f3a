use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;

/// Keys for values cached in Redis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Movie(i32),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Movie(movie_id) => write!(f, "movie:{}", movie_id),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

struct CacheWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Read-through cache for catalog data
///
/// Reads go straight to Redis; writes are queued to a background task so a
/// request never waits on them.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    write_tx: mpsc::UnboundedSender<CacheWrite>,
}

/// Stops the background writer after flushing queued writes
///
/// Dropping the handle without calling [`CacheWriterHandle::shutdown`] also stops
/// the writer, without the flush.
pub struct CacheWriterHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
        tracing::info!("Cache writer stopped");
    }
}

impl Cache {
    /// Connects to Redis and spawns the background writer
    pub async fn new(redis_client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(redis_client).await?;
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(Self::writer_task(conn.clone(), write_rx, shutdown_rx));

        Ok((Self { conn, write_tx }, CacheWriterHandle { shutdown_tx, task }))
    }

    async fn writer_task(
        mut conn: ConnectionManager,
        mut write_rx: mpsc::UnboundedReceiver<CacheWrite>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    Self::write(&mut conn, write).await;
                }
                _ = &mut shutdown_rx => {
                    // Senders live in every Cache clone, so drain instead of waiting for close
                    let mut flushed = 0usize;
                    while let Ok(write) = write_rx.try_recv() {
                        Self::write(&mut conn, write).await;
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Cache writer flushed pending writes");
                    break;
                }
                else => break,
            }
        }
    }

    async fn write(conn: &mut ConnectionManager, write: CacheWrite) {
        let result: redis::RedisResult<()> = conn.set_ex(&write.key, write.value, write.ttl).await;
        if let Err(e) = result {
            tracing::warn!(error = %e, key = %write.key, "Failed to write to Redis cache");
        }
    }

    /// Reads and deserializes a cached value; `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })
            })
            .transpose()
    }

    /// Queues a value for caching with the given TTL in seconds
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let write = CacheWrite {
            key: key.to_string(),
            value,
            ttl,
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer is gone, dropping cache write");
        }
    }
}
