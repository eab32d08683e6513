//! Capacity-bounded set ordered by last write
//!
//! Re-recording a key moves it to the most recent end. Reads never change
//! the order, so "oldest" means least recently *written*.

use crate::cache::types::{CacheStats, InvalidationReason};
use linked_hash_map::LinkedHashMap;
use std::hash::Hash;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct InsertionOrderBoundedSet<K: Hash + Eq> {
    capacity: usize,
    // Front is oldest, back is most recent
    keys: LinkedHashMap<K, ()>,
    evictions: u64,
}

impl<K> InsertionOrderBoundedSet<K>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            keys: LinkedHashMap::new(),
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record `key` as the most recent member, evicting the oldest keys
    /// while over capacity. Returns the evicted keys.
    pub fn record(&mut self, key: K) -> Vec<K> {
        self.keys.remove(&key);
        self.keys.insert(key, ());

        let mut evicted = Vec::new();
        while self.keys.len() > self.capacity {
            match self.keys.pop_front() {
                Some((old, ())) => {
                    debug!("Evicted {:?} from bounded set ({})", old, InvalidationReason::Capacity);
                    evicted.push(old);
                }
                None => break,
            }
        }
        self.evictions += evicted.len() as u64;
        evicted
    }

    /// Members, most recent first
    pub fn all(&self) -> Vec<K> {
        self.keys.iter().rev().map(|(k, _)| k.clone()).collect()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.keys.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Rebuild from a most-recent-first list, truncating to capacity
    pub fn hydrate<I: IntoIterator<Item = K>>(&mut self, most_recent_first: I) {
        self.keys.clear();
        let kept: Vec<K> = most_recent_first.into_iter().collect();
        for key in kept.into_iter().rev() {
            self.record(key);
        }
        self.evictions = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.keys.len(),
            evictions_capacity: self.evictions,
            ..Default::default()
        }
    }
}
