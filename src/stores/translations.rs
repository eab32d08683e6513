//! Translation storage
//!
//! Two layers back the resolution pipeline:
//!
//! - [`TranslationCache`]: in-memory exact-match cache keyed by
//!   `word|from|to`, expiring after a fixed TTL
//! - [`TranslationStore`]: persisted record of every resolved translation,
//!   searchable by word and source language

use crate::cache::{CacheStats, TtlCache};
use crate::clock::Clock;
use crate::models::{normalize_key, TranslationRecord};
use crate::persistence::PersistenceManager;
use linked_hash_map::LinkedHashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

type RecordKey = (String, String, String);

fn record_key(word: &str, from: &str, to: &str) -> RecordKey {
    (normalize_key(word), normalize_key(from), normalize_key(to))
}

/// Key for the exact-match cache
pub fn exact_key(word: &str, from: &str, to: &str) -> String {
    format!(
        "{}|{}|{}",
        normalize_key(word),
        normalize_key(from),
        normalize_key(to)
    )
}

pub struct TranslationCache {
    cache: RwLock<TtlCache<String>>,
}

impl TranslationCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: RwLock::new(TtlCache::new(ttl, clock)),
        }
    }

    pub async fn get_cached_translation(&self, word: &str, from: &str, to: &str) -> Option<String> {
        self.cache.write().await.get(&exact_key(word, from, to))
    }

    pub async fn set_cached_translation(&self, word: &str, from: &str, to: &str, translation: &str) {
        if word.trim().is_empty() || translation.trim().is_empty() {
            return;
        }
        self.cache
            .write()
            .await
            .set(&exact_key(word, from, to), translation.to_string());
    }

    pub async fn purge_expired(&self) -> usize {
        self.cache.write().await.purge_expired()
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }
}

/// Persisted translations, oldest first on disk
pub struct TranslationStore {
    records: RwLock<LinkedHashMap<RecordKey, TranslationRecord>>,
    persistence: PersistenceManager<Vec<TranslationRecord>>,
    clock: Arc<dyn Clock>,
    stats: RwLock<CacheStats>,
}

impl TranslationStore {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(LinkedHashMap::new()),
            persistence: PersistenceManager::new(path),
            clock,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn persistence(&self) -> &PersistenceManager<Vec<TranslationRecord>> {
        &self.persistence
    }

    async fn ready(&self) {
        self.persistence
            .ensure_initialized(|saved| async move {
                let mut records = self.records.write().await;
                for record in saved {
                    if record.word.trim().is_empty() || record.translation.trim().is_empty() {
                        continue;
                    }
                    let key = record_key(&record.word, &record.from, &record.to);
                    records.remove(&key);
                    records.insert(key, record);
                }
                debug!("Restored {} translations", records.len());
            })
            .await;
    }

    fn snapshot(records: &LinkedHashMap<RecordKey, TranslationRecord>) -> Vec<TranslationRecord> {
        records.values().cloned().collect()
    }

    /// Stored translation for one word and direction
    pub async fn lookup(&self, word: &str, from: &str, to: &str) -> Option<String> {
        self.ready().await;
        let found = self
            .records
            .read()
            .await
            .get(&record_key(word, from, to))
            .map(|r| r.translation.clone());

        let mut stats = self.stats.write().await;
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    /// Every stored translation of `word` out of `from`, newest first
    pub async fn find(&self, word: &str, from: &str) -> Vec<TranslationRecord> {
        self.ready().await;
        let word = normalize_key(word);
        let from = normalize_key(from);
        self.records
            .read()
            .await
            .iter()
            .rev()
            .filter(|((w, f, _), _)| *w == word && *f == from)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Save or replace a translation, stamping it with the current time
    pub async fn save(&self, word: &str, from: &str, to: &str, translation: &str) {
        if word.trim().is_empty() || translation.trim().is_empty() {
            return;
        }
        self.ready().await;

        let key = record_key(word, from, to);
        let record = TranslationRecord {
            word: key.0.clone(),
            from: key.1.clone(),
            to: key.2.clone(),
            translation: translation.to_string(),
            timestamp: self.clock.now(),
        };

        let mut records = self.records.write().await;
        records.remove(&key);
        records.insert(key, record);
        self.persistence.schedule(&Self::snapshot(&records));
    }

    pub async fn len(&self) -> usize {
        self.ready().await;
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        self.ready().await;
        let mut stats = self.stats.read().await.clone();
        stats.entries = self.records.read().await.len();
        stats
    }

    pub async fn flush(&self) {
        self.persistence.flush().await;
    }
}
