use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::core::song::SongId;
use crate::error::{CacheError, Result};

// Key-value cache in front of the song text column
#[async_trait]
pub trait TextCache: Send + Sync {
    /// Stores the text without expiry, replacing any previous value.
    async fn create_key(&self, id: SongId, text: &str) -> Result<()>;
    /// `Ok(None)` when the key is absent.
    async fn get_text(&self, id: SongId) -> Result<Option<String>>;
    /// Deleting an absent key succeeds.
    async fn del_key(&self, id: SongId) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

pub fn cache_key(id: SongId) -> String {
    id.to_string()
}

// Redis cache implementation
pub struct RedisTextCache {
    connection: RwLock<Option<ConnectionManager>>,
}

impl RedisTextCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = RedisClient::open(redis_url).map_err(CacheError::Redis)?;
        let manager = ConnectionManager::new(client).await.map_err(CacheError::Redis)?;

        info!("Redis connection created");
        Ok(Self {
            connection: RwLock::new(Some(manager)),
        })
    }

    // ConnectionManager is a cheap handle onto one multiplexed connection
    async fn connection(&self) -> Result<ConnectionManager> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| CacheError::Closed.into())
    }
}

#[async_trait]
impl TextCache for RedisTextCache {
    async fn create_key(&self, id: SongId, text: &str) -> Result<()> {
        let mut con = self.connection().await?;
        let _: () = con.set(cache_key(id), text).await.map_err(CacheError::Redis)?;

        debug!("key: {} was created", id);
        Ok(())
    }

    async fn get_text(&self, id: SongId) -> Result<Option<String>> {
        let mut con = self.connection().await?;
        let text: Option<String> = con.get(cache_key(id)).await.map_err(CacheError::Redis)?;

        match text {
            Some(_) => debug!("Redis cache hit for key: {}", id),
            None => debug!("Redis cache miss for key: {}", id),
        }
        Ok(text)
    }

    async fn del_key(&self, id: SongId) -> Result<()> {
        let mut con = self.connection().await?;
        let removed: i64 = con.del(cache_key(id)).await.map_err(CacheError::Redis)?;

        debug!("key: {} was deleted ({} removed)", id, removed);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.connection.write().await.take().is_some() {
            info!("Redis connection was closed");
        }
        Ok(())
    }
}

/// In-process cache, used when no Redis server is configured.
#[derive(Default)]
pub struct MemoryTextCache {
    entries: RwLock<HashMap<SongId, String>>,
    closed: AtomicBool,
}

impl MemoryTextCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed.into());
        }
        Ok(())
    }
}

#[async_trait]
impl TextCache for MemoryTextCache {
    async fn create_key(&self, id: SongId, text: &str) -> Result<()> {
        self.ensure_open()?;
        self.entries.write().await.insert(id, text.to_string());
        debug!("Cached text for key: {}", id);
        Ok(())
    }

    async fn get_text(&self, id: SongId) -> Result<Option<String>> {
        self.ensure_open()?;
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn del_key(&self, id: SongId) -> Result<()> {
        self.ensure_open()?;
        self.entries.write().await.remove(&id);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.entries.write().await.clear();
        info!("Memory cache closed");
        Ok(())
    }
}
