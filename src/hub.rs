//! One entry point wiring every cache from a single [`CacheConfig`]

use crate::cache::{CacheStats, VersionedClientCache};
use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::models::{NowPlayingEntry, VideoResult, VideoSearch};
use crate::stores::{NowPlayingSnapshot, NowPlayingStore, SeenWords, TranslationCache, TranslationStore, VideoSearchCache};
use crate::translation::{Resolution, TranslationPipeline, Translator};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-cache statistics snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct HubStats {
    pub now_playing: CacheStats,
    pub video_search: CacheStats,
    pub seen_words: CacheStats,
    pub translation_cache: CacheStats,
    pub translation_store: CacheStats,
    pub client_cache: CacheStats,
}

impl HubStats {
    /// Every cache folded into one set of counters
    pub fn total(&self) -> CacheStats {
        [
            &self.video_search,
            &self.seen_words,
            &self.translation_cache,
            &self.translation_store,
            &self.client_cache,
        ]
        .into_iter()
        .fold(self.now_playing.clone(), |acc, s| acc.combine(s))
    }
}

impl fmt::Display for HubStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "now playing:       {}", self.now_playing)?;
        writeln!(f, "video search:      {}", self.video_search)?;
        writeln!(f, "seen words:        {}", self.seen_words)?;
        writeln!(f, "translation cache: {}", self.translation_cache)?;
        writeln!(f, "translation store: {}", self.translation_store)?;
        writeln!(f, "client cache:      {}", self.client_cache)?;
        write!(f, "total:             {}", self.total())
    }
}

pub struct CacheHub {
    config: CacheConfig,
    now_playing: NowPlayingStore,
    video_search: VideoSearchCache,
    seen: Arc<SeenWords>,
    translation_cache: Arc<TranslationCache>,
    translation_store: Arc<TranslationStore>,
    client: VersionedClientCache,
    pipeline: TranslationPipeline,
}

impl CacheHub {
    /// Build every cache against files under `config.data_dir`
    ///
    /// Nothing is read from disk here; each cache loads its file on first use.
    pub fn open(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let seen = Arc::new(SeenWords::new(config.seen_words_path(), config.seen_capacity));
        let translation_cache = Arc::new(TranslationCache::new(config.translation_ttl, clock.clone()));
        let translation_store = Arc::new(TranslationStore::new(config.translations_path(), clock.clone()));
        let pipeline = TranslationPipeline::new(
            translation_cache.clone(),
            translation_store.clone(),
            seen.clone(),
            config.lookup_timeout,
        );

        let hub = Self {
            now_playing: NowPlayingStore::new(
                config.now_playing_path(),
                config.recency_capacity,
                clock.clone(),
            ),
            video_search: VideoSearchCache::new(config.video_search_path(), config.search_ttl, clock.clone()),
            client: VersionedClientCache::new(
                config.client_cache_path(),
                config.app_version.clone(),
                config.client_ttl,
                config.client_capacity,
                clock,
            ),
            seen,
            translation_cache,
            translation_store,
            pipeline,
            config,
        };

        info!("Opened cache hub at {:?}", hub.config.data_dir);
        Ok(hub)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // Recently played

    pub async fn upsert_now_playing(&self, entry: NowPlayingEntry) -> bool {
        self.now_playing.upsert(entry).await
    }

    pub async fn list_now_playing(&self, partition: &str) -> Vec<NowPlayingEntry> {
        self.now_playing.list(partition).await
    }

    pub async fn list_all_now_playing(&self) -> NowPlayingSnapshot {
        self.now_playing.list_all().await
    }

    // Translations

    pub async fn get_cached_translation(&self, word: &str, from: &str, to: &str) -> Option<String> {
        self.translation_cache.get_cached_translation(word, from, to).await
    }

    pub async fn set_cached_translation(&self, word: &str, from: &str, to: &str, translation: &str) {
        self.translation_cache
            .set_cached_translation(word, from, to, translation)
            .await;
    }

    /// Resolve a translation through every tier; never fails
    pub async fn translate(&self, word: &str, from: &str, to: &str, translator: &dyn Translator) -> Resolution {
        self.pipeline.resolve_detailed(word, from, to, translator).await
    }

    pub fn translation_store(&self) -> &TranslationStore {
        &self.translation_store
    }

    // Video searches

    pub async fn get_cached_search(&self, partition_key: &str) -> Option<VideoSearch> {
        self.video_search.get_cached_search(partition_key).await
    }

    pub async fn set_cached_search(&self, partition_key: &str, query: &str, results: Vec<VideoResult>) {
        self.video_search
            .set_cached_search(partition_key, query, results)
            .await;
    }

    // Seen words

    pub async fn record_seen(&self, word: &str) {
        self.seen.record_seen(word).await;
    }

    pub async fn recently_seen(&self) -> Vec<String> {
        self.seen.recently_seen().await
    }

    pub fn client_cache(&self) -> &VersionedClientCache {
        &self.client
    }

    /// Sweep expired records out of the TTL caches
    pub async fn purge_expired(&self) -> usize {
        let searches = self.video_search.purge_expired().await;
        let translations = self.translation_cache.purge_expired().await;
        searches + translations
    }

    pub async fn stats(&self) -> HubStats {
        HubStats {
            now_playing: self.now_playing.stats().await,
            video_search: self.video_search.stats().await,
            seen_words: self.seen.stats().await,
            translation_cache: self.translation_cache.stats().await,
            translation_store: self.translation_store.stats().await,
            client_cache: self.client.stats().await,
        }
    }

    /// Wait until every scheduled write has reached disk
    pub async fn flush(&self) {
        self.now_playing.flush().await;
        self.video_search.flush().await;
        self.seen.flush().await;
        self.translation_store.flush().await;
        self.client.flush().await;
    }
}

/// Background task sweeping expired records every `cleanup_interval`
pub async fn start_auto_cleanup(hub: Arc<CacheHub>) {
    let interval = hub.config.cleanup_interval;

    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        let removed = hub.purge_expired().await;
        if removed > 0 {
            debug!("Auto cleanup: {} expired records", removed);
        }
    }
}
