//! # Bounded cache structures
//!
//! In-memory building blocks, each with a hard bound or expiry rule:
//!
//! - [`RecencyCache`]: per-partition most-recent-first list, O(1) upsert
//!   over an index-linked arena, tail eviction past capacity
//! - [`InsertionOrderBoundedSet`]: scalar keys, oldest-written evicted
//! - [`TtlCache`]: normalized string keys, lazy fixed-TTL expiry
//! - [`VersionedClientCache`]: `(endpoint, params)` responses wiped on an
//!   app version change, with per-entry TTL and a global bound
//!
//! ## Example
//!
//! ```rust
//! use lingo_cache::cache::InsertionOrderBoundedSet;
//!
//! let mut seen = InsertionOrderBoundedSet::new(2);
//! seen.record("hola");
//! seen.record("mundo");
//! seen.record("hola");
//! seen.record("gato");
//!
//! assert_eq!(seen.all(), vec!["gato", "hola"]);
//! ```

pub mod bounded_set;
pub mod recency;
pub mod ttl;
pub mod types;
pub mod versioned;

pub use bounded_set::InsertionOrderBoundedSet;
pub use recency::RecencyCache;
pub use ttl::{TtlCache, TtlRecord};
pub use types::{CacheStats, InvalidationReason};
pub use versioned::{serialize_params, ClientSnapshot, VersionedClientCache, VersionedEntry};
