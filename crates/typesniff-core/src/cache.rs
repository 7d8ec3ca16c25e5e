//! Bounded least-recently-used cache used by the engine runtime.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Fixed-capacity LRU map.
///
/// Recency is tracked with a monotonically increasing tick; the entry with the
/// smallest tick is evicted first. A capacity of zero disables storage.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    cap: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            tick: 0,
            entries: HashMap::with_capacity(cap.min(1024)),
            order: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.next_tick();
        let (_, stamp) = self.entries.get_mut(key)?;
        let old = std::mem::replace(stamp, tick);
        if let Some(k) = self.order.remove(&old) {
            self.order.insert(tick, k);
        }
        self.entries.get(key).map(|(value, _)| value)
    }

    /// Insert or replace `key`, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        if self.cap == 0 {
            return;
        }
        let tick = self.next_tick();
        if let Some((_, old)) = self.entries.insert(key.clone(), (value, tick)) {
            self.order.remove(&old);
        } else if self.entries.len() > self.cap {
            self.evict_oldest();
        }
        self.order.insert(tick, key);
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
