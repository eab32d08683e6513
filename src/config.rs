//! Configuration for the cache layer

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Prefix shared by every environment override
const ENV_PREFIX: &str = "LINGO_CACHE_";

/// Default endpoint for the external translation lookup
pub const DEFAULT_TRANSLATOR_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Configuration for every cache owned by a [`crate::CacheHub`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one JSON snapshot per cache
    pub data_dir: PathBuf,

    /// Entries kept per partition of the recently played list
    pub recency_capacity: usize,

    /// Words kept in the recently seen set
    pub seen_capacity: usize,

    /// How long a per-language search result stays fresh
    pub search_ttl: Duration,

    /// How long an exact (word, from, to) translation stays fresh
    pub translation_ttl: Duration,

    /// Per-entry TTL of the versioned client cache
    pub client_ttl: Duration,

    /// Global entry bound of the versioned client cache
    pub client_capacity: usize,

    /// Build stamp; a change wipes the versioned client cache
    pub app_version: String,

    /// Interval of the background expiry sweep
    pub cleanup_interval: Duration,

    /// Upper bound on a single external lookup
    pub lookup_timeout: Duration,

    /// External translation endpoint
    pub translator_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            recency_capacity: 20,
            seen_capacity: 50,
            // 24 hours
            search_ttl: Duration::from_secs(24 * 3600),
            // 1 week
            translation_ttl: Duration::from_secs(7 * 24 * 3600),
            client_ttl: Duration::from_secs(7 * 24 * 3600),
            client_capacity: 100,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            // Sweep every 5 minutes
            cleanup_interval: Duration::from_secs(300),
            lookup_timeout: Duration::from_secs(10),
            translator_url: DEFAULT_TRANSLATOR_URL.to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("lingo-cache"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from the environment
    ///
    /// A `.env` file in the working directory is read first when present.
    /// Every `LINGO_CACHE_*` variable overrides the matching default.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }

        let mut config = Self::default();

        if let Some(dir) = env_var("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = env_parse::<usize>("RECENCY_CAPACITY")? {
            config.recency_capacity = v;
        }
        if let Some(v) = env_parse::<usize>("SEEN_CAPACITY")? {
            config.seen_capacity = v;
        }
        if let Some(v) = env_parse::<u64>("SEARCH_TTL_SECS")? {
            config.search_ttl = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("TRANSLATION_TTL_SECS")? {
            config.translation_ttl = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("CLIENT_TTL_SECS")? {
            config.client_ttl = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<usize>("CLIENT_CAPACITY")? {
            config.client_capacity = v;
        }
        if let Some(v) = env_var("APP_VERSION") {
            config.app_version = v;
        }
        if let Some(v) = env_parse::<u64>("LOOKUP_TIMEOUT_MS")? {
            config.lookup_timeout = Duration::from_millis(v);
        }
        if let Some(v) = env_var("TRANSLATOR_URL") {
            config.translator_url = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("recency_capacity", self.recency_capacity),
            ("seen_capacity", self.seen_capacity),
            ("client_capacity", self.client_capacity),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(CacheError::Config(format!("{} must be greater than 0", name)));
            }
        }

        let durations = [
            ("search_ttl", self.search_ttl),
            ("translation_ttl", self.translation_ttl),
            ("client_ttl", self.client_ttl),
            ("cleanup_interval", self.cleanup_interval),
            ("lookup_timeout", self.lookup_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(CacheError::Config(format!("{} must be greater than 0", name)));
            }
        }

        if self.app_version.trim().is_empty() {
            return Err(CacheError::Config("app_version must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn now_playing_path(&self) -> PathBuf {
        self.data_dir.join("now_playing.json")
    }

    pub fn video_search_path(&self) -> PathBuf {
        self.data_dir.join("video_search.json")
    }

    pub fn seen_words_path(&self) -> PathBuf {
        self.data_dir.join("seen_words.json")
    }

    pub fn translations_path(&self) -> PathBuf {
        self.data_dir.join("translations.json")
    }

    pub fn client_cache_path(&self) -> PathBuf {
        self.data_dir.join("client_cache.json")
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_var(name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            CacheError::Config(format!("{}{} has an invalid value: {}", ENV_PREFIX, name, raw))
        }),
        None => Ok(None),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    data_dir: Option<PathBuf>,
    recency_capacity: Option<usize>,
    seen_capacity: Option<usize>,
    search_ttl: Option<Duration>,
    translation_ttl: Option<Duration>,
    client_ttl: Option<Duration>,
    client_capacity: Option<usize>,
    app_version: Option<String>,
    cleanup_interval: Option<Duration>,
    lookup_timeout: Option<Duration>,
    translator_url: Option<String>,
}

impl CacheConfigBuilder {
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn recency_capacity(mut self, capacity: usize) -> Self {
        self.recency_capacity = Some(capacity);
        self
    }

    pub fn seen_capacity(mut self, capacity: usize) -> Self {
        self.seen_capacity = Some(capacity);
        self
    }

    pub fn search_ttl(mut self, ttl: Duration) -> Self {
        self.search_ttl = Some(ttl);
        self
    }

    pub fn translation_ttl(mut self, ttl: Duration) -> Self {
        self.translation_ttl = Some(ttl);
        self
    }

    pub fn client_ttl(mut self, ttl: Duration) -> Self {
        self.client_ttl = Some(ttl);
        self
    }

    pub fn client_capacity(mut self, capacity: usize) -> Self {
        self.client_capacity = Some(capacity);
        self
    }

    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    pub fn translator_url(mut self, url: impl Into<String>) -> Self {
        self.translator_url = Some(url.into());
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            recency_capacity: self.recency_capacity.unwrap_or(defaults.recency_capacity),
            seen_capacity: self.seen_capacity.unwrap_or(defaults.seen_capacity),
            search_ttl: self.search_ttl.unwrap_or(defaults.search_ttl),
            translation_ttl: self.translation_ttl.unwrap_or(defaults.translation_ttl),
            client_ttl: self.client_ttl.unwrap_or(defaults.client_ttl),
            client_capacity: self.client_capacity.unwrap_or(defaults.client_capacity),
            app_version: self.app_version.unwrap_or(defaults.app_version),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
            lookup_timeout: self.lookup_timeout.unwrap_or(defaults.lookup_timeout),
            translator_url: self.translator_url.unwrap_or(defaults.translator_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.recency_capacity, 20);
        assert_eq!(config.client_capacity, 100);
        assert_eq!(config.search_ttl, Duration::from_secs(86_400));
        assert_eq!(config.client_ttl, Duration::from_secs(604_800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut invalid = CacheConfig::default();
        invalid.recency_capacity = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = CacheConfig::default();
        invalid.lookup_timeout = Duration::ZERO;
        assert!(invalid.validate().is_err());

        let mut invalid = CacheConfig::default();
        invalid.app_version = "  ".to_string();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .data_dir("/tmp/lingo")
            .recency_capacity(5)
            .client_capacity(3)
            .app_version("2.0.0")
            .build();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/lingo"));
        assert_eq!(config.recency_capacity, 5);
        assert_eq!(config.client_capacity, 3);
        assert_eq!(config.app_version, "2.0.0");
        assert_eq!(config.seen_capacity, 50);
    }

    #[test]
    fn test_snapshot_paths() {
        let config = CacheConfig::builder().data_dir("/data").build();
        assert_eq!(config.now_playing_path(), PathBuf::from("/data/now_playing.json"));
        assert_eq!(config.client_cache_path(), PathBuf::from("/data/client_cache.json"));
    }
}
