use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

const DEFAULT_CAPACITY: usize = 100;

/// Fixed-capacity, least-recently-used image cache keyed by URL.
///
/// Internally synchronized so a conversion thread can share it with whatever
/// owns it; always passed in by the caller, never a process-wide global.
pub struct ImageCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    map: HashMap<String, Bytes>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.hits + self.misses;
        let rate = if total > 0 {
            self.hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        write!(
            f,
            "cache: {} entries, hits={}, misses={}, rate={rate:.0}%",
            self.entries, self.hits, self.misses
        )
    }
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // A poisoned lock only means another thread panicked mid-update; the
        // map itself is still consistent enough for a best-effort cache.
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn get(&self, url: &str) -> Option<Bytes> {
        let mut inner = self.lock();
        if let Some(data) = inner.map.get(url).cloned() {
            inner.hits += 1;
            inner.order.retain(|key| key != url);
            inner.order.push_back(url.to_string());
            Some(data)
        } else {
            inner.misses += 1;
            None
        }
    }

    pub fn put(&self, url: &str, data: Bytes) {
        let mut inner = self.lock();
        if inner.map.contains_key(url) {
            return;
        }
        while inner.map.len() >= self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.map.remove(&oldest);
                }
                None => break,
            }
        }
        inner.map.insert(url.to_string(), data);
        inner.order.push_back(url.to_string());
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.map.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::ImageCache;
    use bytes::Bytes;

    #[test]
    fn hit_and_miss_counters_track_lookups() {
        let cache = ImageCache::new(4);
        assert!(cache.get("a").is_none());
        cache.put("a", Bytes::from_static(b"data"));
        assert_eq!(cache.get("a").as_deref(), Some(b"data".as_slice()));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = ImageCache::new(2);
        cache.put("a", Bytes::from_static(b"1"));
        cache.put("b", Bytes::from_static(b"2"));
        // Touch "a" so "b" becomes the eviction candidate.
        cache.get("a");
        cache.put("c", Bytes::from_static(b"3"));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn duplicate_put_keeps_first_value() {
        let cache = ImageCache::new(2);
        cache.put("a", Bytes::from_static(b"first"));
        cache.put("a", Bytes::from_static(b"second"));
        assert_eq!(cache.get("a").as_deref(), Some(b"first".as_slice()));
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = ImageCache::new(2);
        cache.put("a", Bytes::from_static(b"1"));
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
