//! Crash-safe JSON persistence shared by every cache
//!
//! - [`PersistenceManager`]: single-flight lazy load, atomic save
//! - write-behind worker: serialized, coalescing background saves

pub mod manager;
pub mod writer;

pub use manager::PersistenceManager;
pub use writer::{temp_path, write_atomic};
