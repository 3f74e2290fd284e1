use std::{
    hash::Hash,
    time::{Duration, Instant},
};

use dashmap::DashMap;

/// In-process cache with a fixed per-cache staleness window.
///
/// Every entry remembers when it was stored; [`TtlCache::get`] only serves
/// values still inside the window, while [`TtlCache::get_stale`] ignores the
/// window entirely (used for stale-on-error fallbacks). The cache is an
/// explicit value injected into whatever needs it, never ambient state.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, CacheEntry<V>>,
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Value for `key` if it is still inside the staleness window.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).and_then(|entry| {
            (entry.stored_at.elapsed() <= self.ttl).then(|| entry.value.clone())
        })
    }

    /// Value for `key` regardless of age. Expired entries stay around until
    /// overwritten or evicted so they can back a degraded response.
    pub fn get_stale(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Evict every entry whose staleness window has elapsed.
    pub fn purge_expired(&self) {
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() <= self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_fresh_values() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), 1u32);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"missing".to_string()), None);
    }

    #[test]
    fn expired_values_are_hidden_but_available_stale() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("repo".to_string(), 42u64);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"repo".to_string()), None);
        assert_eq!(cache.get_stale(&"repo".to_string()), Some(42));
    }

    #[test]
    fn purge_removes_expired_entries() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("old".to_string(), 1u32);
        std::thread::sleep(Duration::from_millis(30));
        cache.insert("new".to_string(), 2u32);
        cache.purge_expired();
        assert_eq!(cache.get_stale(&"old".to_string()), None);
        assert_eq!(cache.get(&"new".to_string()), Some(2));
    }

    #[test]
    fn invalidate_and_clear_drop_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), 1u32);
        cache.insert("b".to_string(), 2u32);
        cache.invalidate(&"a".to_string());
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
