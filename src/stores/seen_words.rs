//! Persisted "recently seen words" set

use crate::cache::{CacheStats, InsertionOrderBoundedSet};
use crate::models::normalize_key;
use crate::persistence::PersistenceManager;
use std::path::PathBuf;
use tokio::sync::RwLock;

pub struct SeenWords {
    set: RwLock<InsertionOrderBoundedSet<String>>,
    persistence: PersistenceManager<Vec<String>>,
}

impl SeenWords {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            set: RwLock::new(InsertionOrderBoundedSet::new(capacity)),
            persistence: PersistenceManager::new(path),
        }
    }

    pub fn persistence(&self) -> &PersistenceManager<Vec<String>> {
        &self.persistence
    }

    async fn ready(&self) {
        self.persistence
            .ensure_initialized(|words| async move {
                let words = words
                    .iter()
                    .map(|w| normalize_key(w))
                    .filter(|w| !w.is_empty());
                self.set.write().await.hydrate(words);
            })
            .await;
    }

    /// Record a word as the most recently seen; blank words are ignored
    pub async fn record_seen(&self, word: &str) {
        let word = normalize_key(word);
        if word.is_empty() {
            return;
        }
        self.ready().await;
        let mut set = self.set.write().await;
        set.record(word);
        self.persistence.schedule(&set.all());
    }

    /// Seen words, most recent first
    pub async fn recently_seen(&self) -> Vec<String> {
        self.ready().await;
        self.set.read().await.all()
    }

    pub async fn contains(&self, word: &str) -> bool {
        self.ready().await;
        self.set.read().await.contains(&normalize_key(word))
    }

    pub async fn stats(&self) -> CacheStats {
        self.ready().await;
        self.set.read().await.stats()
    }

    pub async fn flush(&self) {
        self.persistence.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_seen_order() {
        let tmp = TempDir::new().unwrap();
        let seen = SeenWords::new(tmp.path().join("seen.json"), 10);

        seen.record_seen("hola").await;
        seen.record_seen("Hola ").await;
        seen.record_seen("mundo").await;
        seen.record_seen("   ").await;

        assert_eq!(seen.recently_seen().await, vec!["mundo", "hola"]);
        assert!(seen.contains("HOLA").await);
    }

    #[tokio::test]
    async fn test_persisted_as_string_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen.json");
        let seen = SeenWords::new(&path, 10);

        seen.record_seen("uno").await;
        seen.record_seen("dos").await;
        seen.flush().await;

        let raw: Vec<String> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw, vec!["dos", "uno"]);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seen.json");
        std::fs::create_dir_all(path.join("child")).unwrap();
        let seen = SeenWords::new(&path, 10);

        seen.record_seen("hola").await;
        seen.flush().await;

        assert_eq!(seen.recently_seen().await, vec!["hola"]);
        assert!(path.is_dir());
    }
}
