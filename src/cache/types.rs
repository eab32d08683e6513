//! Shared statistics and removal reasons for the cache structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Number of evictions due to the capacity bound
    pub evictions_capacity: u64,

    /// Number of records dropped because their TTL elapsed
    pub evictions_ttl: u64,

    /// Number of manual or version-driven invalidations
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_capacity + self.evictions_ttl
    }

    /// Sum two stat blocks
    pub fn combine(&self, other: &CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            entries: self.entries + other.entries,
            evictions_capacity: self.evictions_capacity + other.evictions_capacity,
            evictions_ttl: self.evictions_ttl + other.evictions_ttl,
            invalidations: self.invalidations + other.invalidations,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, evictions: {}, invalidations: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.total_evictions(),
            self.invalidations
        )
    }
}

/// Why an entry left a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// TTL elapsed
    Expired,

    /// Oldest entry dropped to respect the capacity bound
    Capacity,

    /// Written under a different app version
    VersionMismatch,

    /// Explicit removal
    Manual,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationReason::Expired => write!(f, "TTL expired"),
            InvalidationReason::Capacity => write!(f, "capacity eviction"),
            InvalidationReason::VersionMismatch => write!(f, "version mismatch"),
            InvalidationReason::Manual => write!(f, "manual invalidation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };

        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(stats.miss_rate(), 20.0);
    }

    #[test]
    fn test_cache_stats_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 100.0);
    }

    #[test]
    fn test_cache_stats_combine() {
        let a = CacheStats {
            hits: 1,
            entries: 2,
            evictions_ttl: 3,
            ..Default::default()
        };
        let b = CacheStats {
            misses: 4,
            entries: 5,
            evictions_capacity: 6,
            ..Default::default()
        };
        let sum = a.combine(&b);
        assert_eq!(sum.hits, 1);
        assert_eq!(sum.misses, 4);
        assert_eq!(sum.entries, 7);
        assert_eq!(sum.total_evictions(), 9);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            entries: 75,
            evictions_capacity: 10,
            evictions_ttl: 5,
            invalidations: 3,
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("evictions: 15"));
    }

    #[test]
    fn test_invalidation_reason_display() {
        assert_eq!(InvalidationReason::Expired.to_string(), "TTL expired");
        assert_eq!(InvalidationReason::VersionMismatch.to_string(), "version mismatch");
    }
}
