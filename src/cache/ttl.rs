//! Fixed-expiry cache keyed by a normalized string
//!
//! A record is live while `now - timestamp < ttl`. Expiry is checked
//! lazily on read; [`TtlCache::purge_expired`] is the sweep used by the
//! periodic cleanup task. There is no capacity bound: callers keep the key
//! domain small (one entry per language, or per word and direction).

use crate::cache::types::{CacheStats, InvalidationReason};
use crate::clock::Clock;
use crate::models::normalize_key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A value and the time it was written
///
/// On disk the value's fields are inlined next to `timestamp`, so `V`
/// must serialize as a map when the record is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtlRecord<V> {
    #[serde(flatten)]
    pub value: V,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl<V> TtlRecord<V> {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.timestamp >= ttl
    }
}

pub struct TtlCache<V> {
    ttl: chrono::Duration,
    records: HashMap<String, TtlRecord<V>>,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::days(36_500)),
            records: HashMap::new(),
            clock,
            stats: CacheStats::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::ZERO)
    }

    /// Fetch a live value; an expired record is purged and reported absent
    pub fn get(&mut self, key: &str) -> Option<V> {
        let key = normalize_key(key);
        let now = self.clock.now();

        let expired = self
            .records
            .get(&key)
            .map(|record| record.is_expired(now, self.ttl));

        match expired {
            Some(true) => {
                debug!("Cache entry expired: {} ({})", key, InvalidationReason::Expired);
                self.records.remove(&key);
                self.stats.misses += 1;
                self.stats.evictions_ttl += 1;
                None
            }
            Some(false) => {
                debug!("Cache hit: {}", key);
                self.stats.hits += 1;
                self.records.get(&key).map(|record| record.value.clone())
            }
            None => {
                debug!("Cache miss: {}", key);
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Upsert `value` stamped with the current time
    pub fn set(&mut self, key: &str, value: V) {
        let key = normalize_key(key);
        let timestamp = self.clock.now();
        self.records.insert(key, TtlRecord { value, timestamp });
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let removed = self.records.remove(&normalize_key(key)).map(|r| r.value);
        if removed.is_some() {
            self.stats.invalidations += 1;
        }
        removed
    }

    /// Drop every expired record, returning how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now, ttl));
        let removed = before - self.records.len();

        if removed > 0 {
            self.stats.evictions_ttl += removed as u64;
            debug!("Cleaned up {} expired entries", removed);
        }
        removed
    }

    /// Live records, keyed by normalized key
    pub fn snapshot(&self) -> HashMap<String, TtlRecord<V>> {
        let now = self.clock.now();
        self.records
            .iter()
            .filter(|(_, record)| !record.is_expired(now, self.ttl))
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }

    /// Replace contents from a snapshot, skipping records already expired
    pub fn hydrate(&mut self, snapshot: HashMap<String, TtlRecord<V>>) {
        let now = self.clock.now();
        self.records = snapshot
            .into_iter()
            .filter(|(_, record)| !record.is_expired(now, self.ttl))
            .map(|(key, record)| (normalize_key(&key), record))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.records.len(),
            ..self.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration as ChronoDuration;

    fn cache_with_clock(ttl_secs: u64) -> (TtlCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = TtlCache::new(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_basic_set_and_get() {
        let (mut cache, _) = cache_with_clock(60);
        cache.set("key1", "value1".to_string());

        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_keys_are_normalized() {
        let (mut cache, _) = cache_with_clock(60);
        cache.set("  FR ", "french".to_string());

        assert_eq!(cache.get("fr"), Some("french".to_string()));
        assert_eq!(cache.get("Fr"), Some("french".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_boundary() {
        let (mut cache, clock) = cache_with_clock(100);
        cache.set("k", "v".to_string());

        clock.advance(ChronoDuration::seconds(99));
        assert!(cache.get("k").is_some());

        clock.advance(ChronoDuration::seconds(1));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().evictions_ttl, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_refreshes_timestamp() {
        let (mut cache, clock) = cache_with_clock(10);
        cache.set("k", "v1".to_string());
        clock.advance(ChronoDuration::seconds(8));
        cache.set("k", "v2".to_string());
        clock.advance(ChronoDuration::seconds(8));

        assert_eq!(cache.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn test_purge_expired() {
        let (mut cache, clock) = cache_with_clock(10);
        cache.set("old", "a".to_string());
        clock.advance(ChronoDuration::seconds(6));
        cache.set("new", "b".to_string());
        clock.advance(ChronoDuration::seconds(6));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new"), Some("b".to_string()));
    }

    #[test]
    fn test_hydrate_skips_expired() {
        let (mut cache, clock) = cache_with_clock(10);
        let now = clock.now();
        let mut snapshot = HashMap::new();
        snapshot.insert(
            "Fresh".to_string(),
            TtlRecord {
                value: "a".to_string(),
                timestamp: now,
            },
        );
        snapshot.insert(
            "stale".to_string(),
            TtlRecord {
                value: "b".to_string(),
                timestamp: now - ChronoDuration::seconds(11),
            },
        );

        cache.hydrate(snapshot);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some("a".to_string()));
    }

    #[test]
    fn test_remove() {
        let (mut cache, _) = cache_with_clock(10);
        cache.set("k", "v".to_string());
        assert_eq!(cache.remove("K"), Some("v".to_string()));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().invalidations, 1);
    }
}
