//! Persisted per-language "recently played" lists

use crate::cache::{CacheStats, RecencyCache};
use crate::clock::Clock;
use crate::models::{normalize_key, NowPlayingEntry};
use crate::persistence::PersistenceManager;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Partition key -> entries, most recent first
pub type NowPlayingSnapshot = HashMap<String, Vec<NowPlayingEntry>>;

pub struct NowPlayingStore {
    cache: RwLock<RecencyCache<String, String, NowPlayingEntry>>,
    persistence: PersistenceManager<NowPlayingSnapshot>,
    clock: Arc<dyn Clock>,
}

impl NowPlayingStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: RwLock::new(RecencyCache::new(capacity)),
            persistence: PersistenceManager::new(path),
            clock,
        }
    }

    pub fn persistence(&self) -> &PersistenceManager<NowPlayingSnapshot> {
        &self.persistence
    }

    async fn ready(&self) {
        self.persistence
            .ensure_initialized(|snapshot| async move {
                let restored = snapshot.into_iter().map(|(partition, entries)| {
                    let keyed = entries
                        .into_iter()
                        .filter(NowPlayingEntry::is_well_formed)
                        .map(|entry| (entry.url.trim().to_string(), entry))
                        .collect();
                    (normalize_key(&partition), keyed)
                });
                self.cache.write().await.hydrate(restored);
            })
            .await;
    }

    /// Insert or refresh an entry in its partition
    ///
    /// `updated_at` is stamped from the store's clock; the caller's value
    /// is ignored. Entries with a blank partition, url or title are ignored
    /// and `false` is returned.
    pub async fn upsert(&self, mut entry: NowPlayingEntry) -> bool {
        if !entry.is_well_formed() {
            debug!("Ignoring malformed now-playing entry for {:?}", entry.url);
            return false;
        }
        self.ready().await;

        entry.partition_key = normalize_key(&entry.partition_key);
        entry.url = entry.url.trim().to_string();
        entry.updated_at = self.clock.now();
        let partition = entry.partition_key.clone();
        let key = entry.url.clone();

        let mut cache = self.cache.write().await;
        cache.upsert(partition, key, entry);
        self.persistence.schedule(&cache.list_all());
        true
    }

    /// Entries of one partition, most recent first
    pub async fn list(&self, partition: &str) -> Vec<NowPlayingEntry> {
        self.ready().await;
        self.cache.read().await.list(&normalize_key(partition))
    }

    pub async fn list_all(&self) -> NowPlayingSnapshot {
        self.ready().await;
        self.cache.read().await.list_all()
    }

    pub async fn remove(&self, partition: &str, url: &str) -> bool {
        self.ready().await;
        let mut cache = self.cache.write().await;
        let removed = cache
            .remove(&normalize_key(partition), &url.trim().to_string())
            .is_some();
        if removed {
            self.persistence.schedule(&cache.list_all());
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
