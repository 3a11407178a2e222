//! Bounded cache of fetched backend values

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Hit/miss counters since the cache was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// LRU map from backend key to last fetched value.
///
/// Writes and deletes through the owning adapter invalidate the entry.
/// A capacity of zero turns the cache off entirely.
#[derive(Debug)]
pub struct ValueCache {
    entries: Option<Mutex<LruCache<String, String>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ValueCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: &str, value: &str) {
        if let Some(mut entries) = self.lock() {
            entries.put(key.to_string(), value.to_string());
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Some(mut entries) = self.lock() {
            entries.pop(key);
        }
    }

    pub fn clear(&self) {
        if let Some(mut entries) = self.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().map(|entries| entries.cap().get()).unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<String, String>>> {
        self.entries
            .as_ref()
            .map(|entries| entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_miss_and_eviction() {
        let cache = ValueCache::new(2);
        cache.insert("a", "1");
        cache.insert("b", "2");

        assert_eq!(cache.get("a").as_deref(), Some("1"));
        cache.insert("c", "3");

        // "b" was least recently used
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("c").as_deref(), Some("3"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.stats(), CacheStats { hits: 2, misses: 1 });
    }

    #[test]
    fn test_invalidate() {
        let cache = ValueCache::new(4);
        cache.insert("a", "1");
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        cache.insert("b", "2");
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = ValueCache::disabled();
        cache.insert("a", "1");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.capacity(), 0);
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
