//! # lingo-cache
//!
//! Bounded, crash-safe caches behind a language-learning app.
//!
//! ## Features
//!
//! - Per-language "recently played" lists with O(1) move-to-front
//! - Fixed-TTL caches for video searches and exact translations
//! - A bounded "recently seen words" set
//! - A device-local response cache wiped whenever the app version changes
//! - Tiered translation resolution that never fails: identity, exact
//!   cache, persisted store, then an external lookup under a timeout
//! - One JSON file per cache, loaded lazily once and rewritten atomically
//!   by a background write-behind worker
//!
//! ## Quick start
//!
//! ```no_run
//! use lingo_cache::{CacheConfig, CacheHub, HttpTranslator, SystemClock};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::from_env()?;
//!     let translator = HttpTranslator::new(&config.translator_url, config.lookup_timeout)?;
//!     let hub = CacheHub::open(config, Arc::new(SystemClock))?;
//!
//!     let resolved = hub.translate("gato", "es", "en", &translator).await;
//!     println!("{} (from {})", resolved.text, resolved.source);
//!
//!     hub.flush().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Recently played
//!
//! ```no_run
//! use chrono::Utc;
//! use lingo_cache::{CacheConfig, CacheHub, NowPlayingEntry, SystemClock};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hub = CacheHub::open(CacheConfig::default(), Arc::new(SystemClock))?;
//!
//!     let entry = NowPlayingEntry::new("es", "https://example.com/v/1", "Cuentos", Utc::now())
//!         .with_length("12:03");
//!     hub.upsert_now_playing(entry).await;
//!
//!     for item in hub.list_now_playing("es").await {
//!         println!("{} {}", item.title, item.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod hub;
pub mod models;
pub mod persistence;
pub mod stores;
pub mod translation;

// Re-export main types for convenience
pub use cache::{
    CacheStats, InsertionOrderBoundedSet, InvalidationReason, RecencyCache, TtlCache, TtlRecord,
    VersionedClientCache,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheConfigBuilder};
pub use error::{CacheError, Result};
pub use hub::{start_auto_cleanup, CacheHub, HubStats};
pub use models::{Merge, NowPlayingEntry, TranslationRecord, VideoResult, VideoSearch};
pub use persistence::PersistenceManager;
pub use translation::{HttpTranslator, Resolution, ResolutionSource, TranslationPipeline, Translator};
