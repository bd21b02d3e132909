//! Bounded lookup cache
//!
//! Thin wrapper over a moka sync cache so the resolver and scorer share one
//! get/insert surface with a fixed capacity.

use moka::sync::Cache as MokaCache;
use std::hash::Hash;

/// Capacity-bounded cache with TinyLFU eviction
#[derive(Clone)]
pub struct BoundedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: MokaCache<K, V>,
    capacity: u64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: u64) -> Self {
        log::debug!("Creating bounded cache with capacity {}", capacity);
        BoundedCache {
            inner: MokaCache::new(capacity),
            capacity,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Approximate entry count (eviction is applied lazily)
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl<K, V> std::fmt::Debug for BoundedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_insert() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(16);
        assert_eq!(cache.get(&"a".to_string()), None);

        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        cache.insert("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache: BoundedCache<u32, u32> = BoundedCache::new(8);
        for i in 0..1000 {
            cache.insert(i, i);
        }
        assert!(cache.entry_count() <= 8);
        assert_eq!(cache.capacity(), 8);
    }
}
