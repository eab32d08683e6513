//! Persisted per-language search results with a fixed TTL

use crate::cache::{CacheStats, TtlCache, TtlRecord};
use crate::clock::Clock;
use crate::models::{VideoResult, VideoSearch};
use crate::persistence::PersistenceManager;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// `{ [key]: { query, results, timestamp } }`
pub type VideoSearchSnapshot = HashMap<String, TtlRecord<VideoSearch>>;

pub struct VideoSearchCache {
    cache: RwLock<TtlCache<VideoSearch>>,
    persistence: PersistenceManager<VideoSearchSnapshot>,
}

impl VideoSearchCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: RwLock::new(TtlCache::new(ttl, clock)),
            persistence: PersistenceManager::new(path),
        }
    }

    pub fn persistence(&self) -> &PersistenceManager<VideoSearchSnapshot> {
        &self.persistence
    }

    async fn ready(&self) {
        self.persistence
            .ensure_initialized(|snapshot| async move {
                self.cache.write().await.hydrate(snapshot);
            })
            .await;
    }

    /// Fresh results for `partition_key`, if any
    pub async fn get_cached_search(&self, partition_key: &str) -> Option<VideoSearch> {
        self.ready().await;
        let mut cache = self.cache.write().await;
        let before = cache.len();
        let hit = cache.get(partition_key);
        if cache.len() != before {
            self.persistence.schedule(&cache.snapshot());
        }
        hit
    }

    pub async fn set_cached_search(
        &self,
        partition_key: &str,
        query: impl Into<String>,
        results: Vec<VideoResult>,
    ) {
        if partition_key.trim().is_empty() {
            return;
        }
        self.ready().await;
        let mut cache = self.cache.write().await;
        cache.set(
            partition_key,
            VideoSearch {
                query: query.into(),
                results,
            },
        );
        self.persistence.schedule(&cache.snapshot());
    }

    /// Drop expired searches, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        self.ready().await;
        let mut cache = self.cache.write().await;
        let removed = cache.purge_expired();
        if removed > 0 {
            self.persistence.schedule(&cache.snapshot());
        }
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        self.ready().await;
        self.cache.read().await.stats()
    }

    pub async fn flush(&self) {
        self.persistence.flush().await;
    }
}
