//! Persisted stores built on the bounded cache structures
//!
//! Each store owns its in-memory structure behind a `tokio::sync::RwLock`
//! and a [`PersistenceManager`](crate::persistence::PersistenceManager)
//! for its file. The file is read lazily on first use; every mutation
//! queues a full snapshot on the write-behind worker.

pub mod now_playing;
pub mod seen_words;
pub mod translations;
pub mod video_search;

pub use now_playing::{NowPlayingSnapshot, NowPlayingStore};
pub use seen_words::SeenWords;
pub use translations::{exact_key, TranslationCache, TranslationStore};
pub use video_search::{VideoSearchCache, VideoSearchSnapshot};
