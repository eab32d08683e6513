//! Device-local response cache stamped with the app version
//!
//! Entries are keyed by `(endpoint, serialized params)`. The snapshot
//! carries the version stamp it was written under; loading a snapshot with
//! a different stamp discards everything and immediately persists an
//! empty cache under the current stamp. Each entry also carries its own
//! stamp and per-entry TTL, both checked lazily on read.
//!
//! The global capacity bound evicts the oldest *inserted* entry. Reads do
//! not count as recency.

use crate::cache::types::{CacheStats, InvalidationReason};
use crate::clock::Clock;
use crate::persistence::PersistenceManager;
use chrono::{DateTime, Utc};
use linked_hash_map::LinkedHashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// `(endpoint, serialized params)`
type EntryKey = (String, String);

/// A cached response and the version stamp it was written under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEntry {
    pub endpoint: String,
    pub params: String,
    pub value: serde_json::Value,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// On-disk shape: the stamp plus entries in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSnapshot {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub entries: Vec<VersionedEntry>,
}

struct ClientStore {
    // Front is the oldest insertion
    entries: LinkedHashMap<EntryKey, VersionedEntry>,
    stats: CacheStats,
}

pub struct VersionedClientCache {
    version: String,
    ttl: chrono::Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    store: RwLock<ClientStore>,
    persistence: PersistenceManager<ClientSnapshot>,
}

/// Canonical string form of request params
///
/// Object keys come out sorted, so params built in a different field
/// order still map to the same entry.
pub fn serialize_params<P: Serialize + ?Sized>(params: &P) -> Option<String> {
    match serde_json::to_value(params) {
        Ok(value) => Some(value.to_string()),
        Err(e) => {
            warn!("Request params cannot be used as a cache key: {}", e);
            None
        }
    }
}

impl VersionedClientCache {
    pub fn new(
        path: impl Into<PathBuf>,
        version: impl Into<String>,
        ttl: Duration,
        capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            version: version.into(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::days(7)),
            capacity: capacity.max(1),
            clock,
            store: RwLock::new(ClientStore {
                entries: LinkedHashMap::new(),
                stats: CacheStats::default(),
            }),
            persistence: PersistenceManager::new(path),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn persistence(&self) -> &PersistenceManager<ClientSnapshot> {
        &self.persistence
    }

    async fn ready(&self) {
        self.persistence
            .ensure_initialized(|snapshot| async move {
                self.hydrate(snapshot).await;
            })
            .await;
    }

    async fn hydrate(&self, snapshot: ClientSnapshot) {
        let mut store = self.store.write().await;
        store.entries.clear();

        if snapshot.version != self.version {
            let fresh = snapshot.version.is_empty() && snapshot.entries.is_empty();
            if !fresh {
                info!(
                    "Client cache version changed ({} -> {}), discarding {} entries",
                    snapshot.version,
                    self.version,
                    snapshot.entries.len()
                );
                store.stats.invalidations += snapshot.entries.len() as u64;
                let empty = ClientSnapshot {
                    version: self.version.clone(),
                    entries: Vec::new(),
                };
                self.persistence.persist(&empty).await;
            }
            return;
        }

        for entry in snapshot.entries {
            if entry.version != self.version {
                continue;
            }
            let key = (entry.endpoint.clone(), entry.params.clone());
            store.entries.remove(&key);
            store.entries.insert(key, entry);
        }
        while store.entries.len() > self.capacity {
            store.entries.pop_front();
        }
        debug!("Client cache restored {} entries", store.entries.len());
    }

    fn snapshot(&self, store: &ClientStore) -> ClientSnapshot {
        ClientSnapshot {
            version: self.version.clone(),
            entries: store.entries.values().cloned().collect(),
        }
    }

    /// Cached response for `(endpoint, params)` if live and current
    pub async fn get<T, P>(&self, endpoint: &str, params: &P) -> Option<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.ready().await;
        let key = (endpoint.to_string(), serialize_params(params)?);
        let now = self.clock.now();

        let mut store = self.store.write().await;
        let status = store.entries.get(&key).map(|entry| {
            if entry.version != self.version {
                Some(InvalidationReason::VersionMismatch)
            } else if now - entry.timestamp >= self.ttl {
                Some(InvalidationReason::Expired)
            } else {
                None
            }
        });

        let Some(dead) = status else {
            store.stats.misses += 1;
            debug!("Client cache miss: {} {}", key.0, key.1);
            return None;
        };

        if let Some(reason) = dead {
            debug!("Client cache entry dropped: {} {} ({})", key.0, key.1, reason);
            store.entries.remove(&key);
            store.stats.misses += 1;
            match reason {
                InvalidationReason::Expired => store.stats.evictions_ttl += 1,
                _ => store.stats.invalidations += 1,
            }
            self.persistence.schedule(&self.snapshot(&store));
            return None;
        }

        store.stats.hits += 1;
        let value = store.entries.get(&key)?.value.clone();
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Cached response for {} has an unexpected shape: {}", endpoint, e);
                None
            }
        }
    }

    /// Store a response, evicting the oldest insertion when over capacity
    pub async fn set<T, P>(&self, endpoint: &str, params: &P, value: &T)
    where
        T: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        self.ready().await;
        let Some(params) = serialize_params(params) else {
            return;
        };
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Response for {} cannot be cached: {}", endpoint, e);
                return;
            }
        };

        let entry = VersionedEntry {
            endpoint: endpoint.to_string(),
            params: params.clone(),
            value,
            timestamp: self.clock.now(),
            version: self.version.clone(),
        };
        let key = (endpoint.to_string(), params);

        let mut store = self.store.write().await;
        store.entries.remove(&key);
        store.entries.insert(key, entry);

        while store.entries.len() > self.capacity {
            if let Some(((old_endpoint, old_params), _)) = store.entries.pop_front() {
                debug!(
                    "Client cache evicted {} {} ({})",
                    old_endpoint,
                    old_params,
                    InvalidationReason::Capacity
                );
                store.stats.evictions_capacity += 1;
            }
        }

        self.persistence.schedule(&self.snapshot(&store));
    }

    /// Drop one entry
    pub async fn invalidate<P: Serialize + ?Sized>(&self, endpoint: &str, params: &P) -> bool {
        self.ready().await;
        let Some(params) = serialize_params(params) else {
            return false;
        };
        let mut store = self.store.write().await;
        let removed = store.entries.remove(&(endpoint.to_string(), params)).is_some();
        if removed {
            store.stats.invalidations += 1;
            self.persistence.schedule(&self.snapshot(&store));
        }
        removed
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.ready().await;
        let mut store = self.store.write().await;
        let count = store.entries.len();
        store.entries.clear();
        store.stats.invalidations += count as u64;
        self.persistence.schedule(&self.snapshot(&store));
        info!("Cleared {} entries from client cache", count);
    }

    pub async fn len(&self) -> usize {
        self.ready().await;
        self.store.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        self.ready().await;
        let store = self.store.read().await;
        CacheStats {
            entries: store.entries.len(),
            ..store.stats.clone()
        }
    }

    /// Wait for pending writes to reach the disk
    pub async fn flush(&self) {
        self.persistence.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;
    use tempfile::TempDir;

    fn cache(dir: &TempDir, version: &str, capacity: usize, clock: Arc<ManualClock>) -> VersionedClientCache {
        VersionedClientCache::new(
            dir.path().join("client.json"),
            version,
            Duration::from_secs(7 * 24 * 3600),
            capacity,
            clock,
        )
    }

    #[test]
    fn test_params_are_order_independent() {
        let a = serialize_params(&json!({"lang": "es", "page": 2})).unwrap();
        let b = serialize_params(&json!({"page": 2, "lang": "es"})).unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let cache = cache(&dir, "1.0.0", 10, clock);

        cache.set("/videos", &json!({"lang": "fr"}), &vec!["a", "b"]).await;
        let hit: Option<Vec<String>> = cache.get("/videos", &json!({"lang": "fr"})).await;
        assert_eq!(hit, Some(vec!["a".to_string(), "b".to_string()]));

        let miss: Option<Vec<String>> = cache.get("/videos", &json!({"lang": "de"})).await;
        assert!(miss.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let cache = cache(&dir, "1.0.0", 10, clock.clone());

        cache.set("/words", &json!({}), &"payload").await;
        clock.advance(chrono::Duration::days(7) - chrono::Duration::seconds(1));
        assert_eq!(cache.get::<String, _>("/words", &json!({})).await, Some("payload".into()));

        clock.advance(chrono::Duration::seconds(2));
        assert!(cache.get::<String, _>("/words", &json!({})).await.is_none());
        assert_eq!(cache.stats().await.evictions_ttl, 1);
    }

    #[tokio::test]
    async fn test_evicts_oldest_insertion_not_oldest_read() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let cache = cache(&dir, "1.0.0", 2, clock);

        cache.set("/a", &json!({}), &1).await;
        cache.set("/b", &json!({}), &2).await;
        // Reading /a does not protect it
        assert_eq!(cache.get::<i32, _>("/a", &json!({})).await, Some(1));
        cache.set("/c", &json!({}), &3).await;

        assert!(cache.get::<i32, _>("/a", &json!({})).await.is_none());
        assert_eq!(cache.get::<i32, _>("/b", &json!({})).await, Some(2));
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.stats().await.evictions_capacity, 1);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let cache = cache(&dir, "1.0.0", 10, clock);

        cache.set("/a", &json!({"x": 1}), &1).await;
        cache.set("/b", &json!({"x": 1}), &2).await;

        assert!(cache.invalidate("/a", &json!({"x": 1})).await);
        assert!(!cache.invalidate("/a", &json!({"x": 1})).await);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let cache = cache(&dir, "1.0.0", 10, clock);

        cache.set("/a", &json!({}), &"text").await;
        assert!(cache.get::<Vec<u32>, _>("/a", &json!({})).await.is_none());
    }
}
