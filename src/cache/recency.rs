//! Partitioned, capacity-bounded recency cache
//!
//! Each partition owns an arena of nodes (`Vec<Option<Node>>`) threaded
//! into a doubly-linked list by index, plus a key -> handle index for O(1)
//! lookup. The head is the most recently written entry, the tail the
//! oldest. Removed slots go onto a free list and are reused, so a
//! partition's arena never grows past `capacity + 1` slots.
//!
//! Partitions never share eviction state: filling one partition never
//! evicts from another.

use crate::cache::types::{CacheStats, InvalidationReason};
use crate::models::Merge;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Arena handle
type Handle = usize;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// One partition's ordered list
#[derive(Debug)]
struct PartitionList<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
    index: HashMap<K, Handle>,
}

impl<K: Hash + Eq + Clone, V> PartitionList<K, V> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            index: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn node(&self, handle: Handle) -> &Node<K, V> {
        self.slots[handle]
            .as_ref()
            .expect("index points at a live slot")
    }

    fn node_mut(&mut self, handle: Handle) -> &mut Node<K, V> {
        self.slots[handle]
            .as_mut()
            .expect("index points at a live slot")
    }

    fn allocate(&mut self, key: K, value: V) -> Handle {
        let node = Node {
            key,
            value,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(node);
                handle
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Detach a node from its neighbours, leaving it allocated
    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = {
            let node = self.node(handle);
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(handle);
        node.prev = None;
        node.next = None;
    }

    fn link_front(&mut self, handle: Handle) {
        let old_head = self.head;
        {
            let node = self.node_mut(handle);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
    }

    fn link_back(&mut self, handle: Handle) {
        let old_tail = self.tail;
        {
            let node = self.node_mut(handle);
            node.next = None;
            node.prev = old_tail;
        }
        match old_tail {
            Some(t) => self.node_mut(t).next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
    }

    fn push_front(&mut self, key: K, value: V) {
        let handle = self.allocate(key.clone(), value);
        self.link_front(handle);
        self.index.insert(key, handle);
    }

    fn push_back(&mut self, key: K, value: V) {
        let handle = self.allocate(key.clone(), value);
        self.link_back(handle);
        self.index.insert(key, handle);
    }

    fn move_to_front(&mut self, handle: Handle) {
        if self.head == Some(handle) {
            return;
        }
        self.unlink(handle);
        self.link_front(handle);
    }

    /// Unlink, free and return the node at `handle`
    fn release(&mut self, handle: Handle) -> (K, V) {
        self.unlink(handle);
        let node = self.slots[handle]
            .take()
            .expect("released handle points at a live slot");
        self.free.push(handle);
        self.index.remove(&node.key);
        (node.key, node.value)
    }

    fn pop_back(&mut self) -> Option<(K, V)> {
        let tail = self.tail?;
        Some(self.release(tail))
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let handle = *self.index.get(key)?;
        Some(self.release(handle).1)
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&h| &self.node(h).value)
    }

    fn iter(&self) -> PartitionIter<'_, K, V> {
        PartitionIter {
            list: self,
            cursor: self.head,
        }
    }
}

/// Front-to-back iterator over a partition
struct PartitionIter<'a, K, V> {
    list: &'a PartitionList<K, V>,
    cursor: Option<Handle>,
}

impl<'a, K: Hash + Eq + Clone, V> Iterator for PartitionIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let node = self.list.node(handle);
        self.cursor = node.next;
        Some((&node.key, &node.value))
    }
}

/// Most-recent-first cache split into independently bounded partitions
#[derive(Debug)]
pub struct RecencyCache<P, K, V> {
    capacity: usize,
    partitions: HashMap<P, PartitionList<K, V>>,
    stats: CacheStats,
    // Reads take `&self`
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<P, K, V> RecencyCache<P, K, V>
where
    P: Hash + Eq + Clone + std::fmt::Debug,
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone + Merge,
{
    /// Create a cache holding at most `capacity` entries per partition
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            partitions: HashMap::new(),
            stats: CacheStats::default(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert or refresh `key` in `partition`
    ///
    /// An existing key is merged with `value` and moved to the front; the
    /// partition size is unchanged. A new key is pushed to the front and
    /// the tail is evicted while the partition is over capacity. Returns
    /// the number of evicted entries.
    pub fn upsert(&mut self, partition: P, key: K, value: V) -> usize {
        let capacity = self.capacity;
        let list = self
            .partitions
            .entry(partition.clone())
            .or_insert_with(PartitionList::new);

        if let Some(&handle) = list.index.get(&key) {
            list.node_mut(handle).value.merge(value);
            list.move_to_front(handle);
            debug!("Refreshed {:?} in partition {:?}", key, partition);
            return 0;
        }

        list.push_front(key, value);

        let mut evicted = 0;
        while list.len() > capacity {
            match list.pop_back() {
                Some((old_key, _)) => {
                    debug!(
                        "Evicted {:?} from partition {:?} ({})",
                        old_key,
                        partition,
                        InvalidationReason::Capacity
                    );
                    evicted += 1;
                }
                None => break,
            }
        }
        self.stats.evictions_capacity += evicted as u64;
        evicted
    }

    fn count_read(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Entries of one partition, most recent first
    ///
    /// Counts as a hit when the partition holds anything.
    pub fn list(&self, partition: &P) -> Vec<V> {
        let entries: Vec<V> = self
            .partitions
            .get(partition)
            .map(|list| list.iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default();
        self.count_read(!entries.is_empty());
        entries
    }

    /// Keys of one partition, most recent first
    pub fn keys(&self, partition: &P) -> Vec<K> {
        self.partitions
            .get(partition)
            .map(|list| list.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of every partition
    pub fn list_all(&self) -> HashMap<P, Vec<V>> {
        self.partitions
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(p, list)| (p.clone(), list.iter().map(|(_, v)| v.clone()).collect()))
            .collect()
    }

    /// Look up an entry without touching its position
    pub fn get(&self, partition: &P, key: &K) -> Option<&V> {
        let found = self.partitions.get(partition).and_then(|list| list.get(key));
        self.count_read(found.is_some());
        found
    }

    /// Remove an entry; empty partitions are dropped
    pub fn remove(&mut self, partition: &P, key: &K) -> Option<V> {
        let list = self.partitions.get_mut(partition)?;
        let removed = list.remove(key);
        if list.is_empty() {
            self.partitions.remove(partition);
        }
        if removed.is_some() {
            self.stats.invalidations += 1;
        }
        removed
    }

    /// Number of entries in `partition`
    pub fn len(&self, partition: &P) -> usize {
        self.partitions.get(partition).map_or(0, |l| l.len())
    }

    /// Number of entries across all partitions
    pub fn total_len(&self) -> usize {
        self.partitions.values().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    pub fn partitions(&self) -> Vec<P> {
        self.partitions
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Replace all contents with most-recent-first partition arrays
    ///
    /// Duplicate keys keep their first (most recent) occurrence and every
    /// partition is truncated to capacity.
    pub fn hydrate<I>(&mut self, snapshot: I)
    where
        I: IntoIterator<Item = (P, Vec<(K, V)>)>,
    {
        self.partitions.clear();
        for (partition, entries) in snapshot {
            let mut list = PartitionList::new();
            for (key, value) in entries {
                if list.len() >= self.capacity {
                    break;
                }
                if list.index.contains_key(&key) {
                    continue;
                }
                list.push_back(key, value);
            }
            if !list.is_empty() {
                self.partitions.insert(partition, list);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.total_len(),
            ..self.stats.clone()
        }
    }

    #[cfg(test)]
    fn arena_slots(&self, partition: &P) -> usize {
        self.partitions.get(partition).map_or(0, |l| l.slots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        label: String,
        plays: u32,
    }

    impl Merge for Item {
        fn merge(&mut self, newer: Self) {
            if !newer.label.is_empty() {
                self.label = newer.label;
            }
            self.plays += newer.plays;
        }
    }

    fn item(label: &str) -> Item {
        Item {
            label: label.to_string(),
            plays: 1,
        }
    }

    fn labels(cache: &RecencyCache<&'static str, u32, Item>, p: &'static str) -> Vec<String> {
        cache.list(&p).into_iter().map(|i| i.label).collect()
    }

    #[test]
    fn test_list_is_most_recent_first() {
        let mut cache = RecencyCache::new(5);
        cache.upsert("es", 1, item("a"));
        cache.upsert("es", 2, item("b"));
        cache.upsert("es", 3, item("c"));

        assert_eq!(labels(&cache, "es"), vec!["c", "b", "a"]);
        assert_eq!(cache.keys(&"es"), vec![3, 2, 1]);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut cache = RecencyCache::new(4);
        for i in 0..50u32 {
            cache.upsert("fr", i % 7, item(&i.to_string()));
            assert!(cache.len(&"fr") <= 4);
        }
        assert!(cache.arena_slots(&"fr") <= 5);
    }

    #[test]
    fn test_existing_key_moves_to_front_without_growing() {
        let mut cache = RecencyCache::new(3);
        cache.upsert("es", 1, item("a"));
        cache.upsert("es", 2, item("b"));
        cache.upsert("es", 3, item("c"));

        let evicted = cache.upsert("es", 1, item("a2"));

        assert_eq!(evicted, 0);
        assert_eq!(cache.len(&"es"), 3);
        assert_eq!(labels(&cache, "es"), vec!["a2", "c", "b"]);
        assert_eq!(cache.get(&"es", &1).unwrap().plays, 2);
    }

    #[test]
    fn test_tail_is_evicted() {
        let mut cache = RecencyCache::new(2);
        cache.upsert("de", 1, item("a"));
        cache.upsert("de", 2, item("b"));
        let evicted = cache.upsert("de", 3, item("c"));

        assert_eq!(evicted, 1);
        assert!(cache.get(&"de", &1).is_none());
        assert_eq!(labels(&cache, "de"), vec!["c", "b"]);
        assert_eq!(cache.stats().evictions_capacity, 1);
    }

    #[test]
    fn test_touch_protects_from_eviction() {
        let mut cache = RecencyCache::new(2);
        cache.upsert("de", 1, item("a"));
        cache.upsert("de", 2, item("b"));
        cache.upsert("de", 1, item("a"));
        cache.upsert("de", 3, item("c"));

        assert_eq!(cache.keys(&"de"), vec![3, 1]);
    }

    #[test]
    fn test_partitions_are_independent() {
        let mut cache = RecencyCache::new(2);
        cache.upsert("es", 1, item("es1"));
        cache.upsert("es", 2, item("es2"));
        cache.upsert("fr", 1, item("fr1"));
        cache.upsert("fr", 2, item("fr2"));
        cache.upsert("fr", 3, item("fr3"));

        assert_eq!(labels(&cache, "es"), vec!["es2", "es1"]);
        assert_eq!(labels(&cache, "fr"), vec!["fr3", "fr2"]);

        let all = cache.list_all();
        assert_eq!(all.len(), 2);
        assert_eq!(cache.total_len(), 4);
    }

    #[test]
    fn test_remove_middle_and_reuse_slot() {
        let mut cache = RecencyCache::new(5);
        cache.upsert("it", 1, item("a"));
        cache.upsert("it", 2, item("b"));
        cache.upsert("it", 3, item("c"));

        assert_eq!(cache.remove(&"it", &2).map(|i| i.label), Some("b".to_string()));
        assert_eq!(labels(&cache, "it"), vec!["c", "a"]);

        cache.upsert("it", 4, item("d"));
        assert_eq!(cache.arena_slots(&"it"), 3);
        assert_eq!(labels(&cache, "it"), vec!["d", "c", "a"]);
    }

    #[test]
    fn test_removing_last_entry_drops_partition() {
        let mut cache = RecencyCache::new(5);
        cache.upsert("pt", 1, item("a"));
        cache.remove(&"pt", &1);

        assert!(cache.partitions().is_empty());
        assert!(cache.is_empty());
        assert!(cache.list(&"pt").is_empty());
    }

    #[test]
    fn test_hydrate_truncates_and_dedupes() {
        let mut cache = RecencyCache::new(2);
        cache.hydrate(vec![(
            "ja",
            vec![(1, item("newest")), (1, item("dup")), (2, item("mid")), (3, item("old"))],
        )]);

        assert_eq!(labels(&cache, "ja"), vec!["newest", "mid"]);

        cache.upsert("ja", 4, item("fresh"));
        assert_eq!(labels(&cache, "ja"), vec!["fresh", "newest"]);
    }

    #[test]
    fn test_single_entry_relink() {
        let mut cache = RecencyCache::new(1);
        cache.upsert("ko", 1, item("a"));
        cache.upsert("ko", 1, item("b"));
        cache.upsert("ko", 2, item("c"));

        assert_eq!(labels(&cache, "ko"), vec!["c"]);
        assert_eq!(cache.len(&"ko"), 1);
    }

    #[test]
    fn test_reads_count_hits_and_misses() {
        let mut cache = RecencyCache::new(3);
        cache.upsert("es", 1, item("a"));

        assert_eq!(labels(&cache, "es"), vec!["a"]);
        assert!(labels(&cache, "fr").is_empty());
        assert!(cache.get(&"es", &1).is_some());
        assert!(cache.get(&"es", &2).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hit_rate(), 50.0);
    }
}
