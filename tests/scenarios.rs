//! End-to-end scenarios through the hub

use async_trait::async_trait;
use chrono::Utc;
use lingo_cache::{
    CacheConfig, CacheError, CacheHub, ManualClock, NowPlayingEntry, ResolutionSource, Result,
    Translator, VideoResult,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(&self, _word: &str, _from: &str, _to: &str) -> Result<String> {
        Err(CacheError::ExternalService("HTTP 500".to_string()))
    }
}

struct SlowTranslator;

#[async_trait]
impl Translator for SlowTranslator {
    async fn translate(&self, word: &str, _from: &str, _to: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(format!("{}!", word))
    }
}

struct EchoTranslator;

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(&self, word: &str, _from: &str, to: &str) -> Result<String> {
        Ok(format!("{}:{}", to, word))
    }
}

fn open_hub(tmp: &TempDir, clock: Arc<ManualClock>) -> CacheHub {
    let config = CacheConfig::builder()
        .data_dir(tmp.path())
        .lookup_timeout(Duration::from_millis(50))
        .build();
    CacheHub::open(config, clock).unwrap()
}

#[tokio::test]
async fn test_twenty_first_insert_evicts_oldest() {
    let tmp = TempDir::new().unwrap();
    let hub = open_hub(&tmp, Arc::new(ManualClock::starting_now()));

    for n in 1..=21 {
        let entry = NowPlayingEntry::new("es", format!("https://videos.test/{}", n), format!("Video {}", n), Utc::now());
        assert!(hub.upsert_now_playing(entry).await);
    }

    let urls: Vec<String> = hub
        .list_now_playing("es")
        .await
        .into_iter()
        .map(|e| e.url)
        .collect();
    let expected: Vec<String> = (2..=21).rev().map(|n| format!("https://videos.test/{}", n)).collect();

    assert_eq!(urls.len(), 20);
    assert_eq!(urls, expected);
    assert!(!urls.contains(&"https://videos.test/1".to_string()));
    assert_eq!(hub.stats().await.now_playing.evictions_capacity, 1);
}

#[tokio::test]
async fn test_translation_cache_is_direction_specific() {
    let tmp = TempDir::new().unwrap();
    let hub = open_hub(&tmp, Arc::new(ManualClock::starting_now()));

    hub.set_cached_translation("casa", "es", "en", "house").await;

    assert_eq!(
        hub.get_cached_translation("casa", "es", "en").await.as_deref(),
        Some("house")
    );
    assert!(hub.get_cached_translation("casa", "en", "es").await.is_none());
}

#[tokio::test]
async fn test_search_expires_after_a_day() {
    let tmp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::starting_now());
    let hub = open_hub(&tmp, clock.clone());

    let results = vec![VideoResult {
        title: "Le petit prince".to_string(),
        url: "https://videos.test/fr/1".to_string(),
        thumbnail_url: Some("https://img.test/1.jpg".to_string()),
        length: Some("8:12".to_string()),
    }];
    hub.set_cached_search("fr", "french a1", results.clone()).await;

    let hit = hub.get_cached_search("fr").await.unwrap();
    assert_eq!(hit.query, "french a1");
    assert_eq!(hit.results, results);

    clock.advance(chrono::Duration::hours(24) + chrono::Duration::seconds(1));
    assert!(hub.get_cached_search("fr").await.is_none());
}

#[tokio::test]
async fn test_recently_seen_dedupes() {
    let tmp = TempDir::new().unwrap();
    let hub = open_hub(&tmp, Arc::new(ManualClock::starting_now()));

    hub.record_seen("hola").await;
    hub.record_seen("hola").await;
    hub.record_seen("mundo").await;

    assert_eq!(hub.recently_seen().await, vec!["mundo", "hola"]);
}

#[tokio::test]
async fn test_failed_lookup_returns_input_untouched() {
    let tmp = TempDir::new().unwrap();
    let hub = open_hub(&tmp, Arc::new(ManualClock::starting_now()));

    let resolved = hub.translate("mariposa", "es", "en", &FailingTranslator).await;
    assert_eq!(resolved.text, "mariposa");
    assert_eq!(resolved.source, ResolutionSource::Unresolved);

    let resolved = hub.translate("mariposa", "es", "en", &SlowTranslator).await;
    assert_eq!(resolved.text, "mariposa");
    assert_eq!(resolved.source, ResolutionSource::Unresolved);

    assert!(hub.get_cached_translation("mariposa", "es", "en").await.is_none());
    assert!(hub.translation_store().is_empty().await);
    assert!(hub.recently_seen().await.is_empty());
}

#[tokio::test]
async fn test_resolved_translation_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::starting_now());

    let hub = open_hub(&tmp, clock.clone());
    let first = hub.translate("luna", "es", "en", &EchoTranslator).await;
    assert_eq!(first.text, "en:luna");
    assert_eq!(first.source, ResolutionSource::External);
    hub.flush().await;
    drop(hub);

    // Exact cache is memory-only; the store answers after a restart
    let hub = open_hub(&tmp, clock);
    let again = hub.translate("luna", "es", "en", &FailingTranslator).await;
    assert_eq!(again.text, "en:luna");
    assert_eq!(again.source, ResolutionSource::Store);
    assert_eq!(hub.recently_seen().await, vec!["luna"]);
}

#[tokio::test]
async fn test_corrupt_files_start_empty() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("now_playing.json"), "{not json").unwrap();
    std::fs::write(tmp.path().join("seen_words.json"), r#"{"unexpected": true}"#).unwrap();

    let hub = open_hub(&tmp, Arc::new(ManualClock::starting_now()));
    assert!(hub.list_all_now_playing().await.is_empty());
    assert!(hub.recently_seen().await.is_empty());

    hub.record_seen("nuevo").await;
    hub.flush().await;
    let raw = std::fs::read_to_string(tmp.path().join("seen_words.json")).unwrap();
    assert_eq!(raw, r#"["nuevo"]"#);
}
