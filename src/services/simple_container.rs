use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::data::PostgresSongStore;
use crate::core::infrastructure::cache::{MemoryTextCache, RedisTextCache, TextCache};
use crate::core::services::metadata::MetadataClient;
use crate::error::Result;
use crate::services::SongService;

pub struct SimpleServices {
    config: Arc<Config>,
}

impl SimpleServices {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Connects the pool and brings the schema up to date.
    pub async fn create_store(&self) -> Result<Arc<PostgresSongStore>> {
        let url = self.config.database_url()?;
        let store = PostgresSongStore::connect(&url, self.config.db_max_connections).await?;
        store.migrate().await?;
        Ok(Arc::new(store))
    }

    /// Redis when configured, otherwise an in-process cache.
    pub async fn create_cache(&self) -> Result<Arc<dyn TextCache>> {
        match self.config.redis_url()? {
            Some(url) => {
                let cache = RedisTextCache::connect(&url).await?;
                Ok(Arc::new(cache))
            }
            None => {
                warn!("No Redis configured, song texts are cached in memory");
                Ok(Arc::new(MemoryTextCache::new()))
            }
        }
    }

    pub async fn create_song_service(&self, store: Arc<PostgresSongStore>) -> Result<SongService> {
        let cache = self.create_cache().await?;
        let metadata = MetadataClient::new()?;

        info!("Song service created");
        Ok(SongService::new(store, cache, metadata))
    }
}
