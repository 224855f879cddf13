//! In-memory LRU image cache implementation.
//!
//! Entries can disappear at any time when the cache is over its entry or
//! byte ceiling, or when [`MemoryImageCache::reclaim`] is called under memory
//! pressure. Callers must treat a vanished entry as an ordinary miss.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, decoded_size};

/// Default maximum number of images held in memory.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default ceiling on decoded pixel bytes held in memory (64 MiB).
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

struct Entries {
    lru: LruCache<CacheKey, Arc<image::DynamicImage>>,
    bytes: usize,
}

impl Entries {
    fn pop_lru(&mut self) -> Option<CacheKey> {
        let (key, img) = self.lru.pop_lru()?;
        self.bytes = self.bytes.saturating_sub(decoded_size(&img));
        Some(key)
    }
}

/// In-memory LRU cache for decoded images, bounded by count and bytes.
/// Thread-safe; all locking is internal.
pub struct MemoryImageCache {
    entries: Mutex<Entries>,
    max_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the given entry and byte ceilings.
    #[must_use]
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(Entries {
                lru: LruCache::new(cap),
                bytes: 0,
            }),
            max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default ceilings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_BYTES)
    }

    /// Looks up an image, promoting it in the LRU on a hit.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<image::DynamicImage>> {
        let mut entries = self.entries.lock();
        if let Some(img) = entries.lru.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    /// Peeks at an image without promoting it or touching statistics.
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<image::DynamicImage>> {
        self.entries.lock().lru.peek(key).cloned()
    }

    /// Stores an image, unconditionally replacing any previous entry.
    ///
    /// An image larger than the byte ceiling is not retained; the previous
    /// entry for the key is still dropped so stale data is never served.
    pub fn put(&self, key: CacheKey, image: Arc<image::DynamicImage>) {
        let size = decoded_size(&image);
        let mut entries = self.entries.lock();

        if size > self.max_bytes {
            if let Some(old) = entries.lru.pop(&key) {
                entries.bytes = entries.bytes.saturating_sub(decoded_size(&old));
            }
            debug!(key = %key, size, max_bytes = self.max_bytes, "Image exceeds memory ceiling, not cached");
            return;
        }

        if let Some((displaced_key, displaced)) = entries.lru.push(key.clone(), image) {
            entries.bytes = entries.bytes.saturating_sub(decoded_size(&displaced));
            if displaced_key != key {
                debug!(key = %displaced_key, "Evicted image from memory cache");
            }
        }
        entries.bytes += size;

        while entries.bytes > self.max_bytes {
            match entries.pop_lru() {
                Some(evicted) => debug!(key = %evicted, "Evicted image from memory cache"),
                None => break,
            }
        }

        debug!(key = %key, size, "Stored image in memory cache");
    }

    /// Removes one entry. Returns true if something was removed.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut entries = self.entries.lock();
        if let Some(old) = entries.lru.pop(key) {
            entries.bytes = entries.bytes.saturating_sub(decoded_size(&old));
            debug!(key = %key, "Removed image from memory cache");
            true
        } else {
            false
        }
    }

    /// Drops least-recently-used entries until at most `target_bytes` remain.
    /// Returns the number of entries dropped.
    pub fn reclaim(&self, target_bytes: usize) -> usize {
        let mut entries = self.entries.lock();
        let mut dropped = 0;
        while entries.bytes > target_bytes && entries.pop_lru().is_some() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, remaining_bytes = entries.bytes, "Reclaimed memory cache");
        }
        dropped
    }

    /// Clears every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.lru.clear();
        entries.bytes = 0;
        debug!("Cleared memory image cache");
    }

    /// Number of cached images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().lru.len()
    }

    /// Returns true if the cache holds no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decoded bytes currently held.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.entries.lock().bytes
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let entries = self.entries.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: entries.lru.len(),
            bytes: entries.bytes,
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

/// Statistics about memory cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Decoded bytes currently held.
    pub bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} bytes), {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.bytes, self.hit_rate, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CacheKey {
        CacheKey::parse(s).unwrap()
    }

    fn rgba(w: u32, h: u32) -> Arc<image::DynamicImage> {
        Arc::new(image::DynamicImage::new_rgba8(w, h))
    }

    #[test]
    fn test_put_and_get() {
        let cache = MemoryImageCache::new(10, 1024 * 1024);
        let img = rgba(100, 100);

        cache.put(key("a"), img.clone());

        let retrieved = cache.get(&key("a")).unwrap();
        assert!(Arc::ptr_eq(&retrieved, &img));
        assert_eq!(cache.bytes(), 100 * 100 * 4);
    }

    #[test]
    fn test_miss() {
        let cache = MemoryImageCache::with_defaults();
        assert!(cache.get(&key("missing")).is_none());
    }

    #[test]
    fn test_put_replaces_unconditionally() {
        let cache = MemoryImageCache::new(10, 1024 * 1024);
        cache.put(key("a"), rgba(10, 10));
        let replacement = rgba(20, 20);
        cache.put(key("a"), replacement.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.bytes(), 20 * 20 * 4);
        assert!(Arc::ptr_eq(&cache.get(&key("a")).unwrap(), &replacement));
    }

    #[test]
    fn test_entry_ceiling_evicts_lru() {
        let cache = MemoryImageCache::new(2, 1024 * 1024);
        cache.put(key("a"), rgba(10, 10));
        cache.put(key("b"), rgba(10, 10));
        cache.put(key("c"), rgba(10, 10));

        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("b")).is_some());
        assert!(cache.get(&key("c")).is_some());
        assert_eq!(cache.bytes(), 2 * 10 * 10 * 4);
    }

    #[test]
    fn test_byte_ceiling_evicts_lru() {
        // Each 10x10 RGBA image is 400 bytes.
        let cache = MemoryImageCache::new(100, 1000);
        cache.put(key("a"), rgba(10, 10));
        cache.put(key("b"), rgba(10, 10));
        let _ = cache.get(&key("a"));
        cache.put(key("c"), rgba(10, 10));

        assert!(cache.peek(&key("a")).is_some());
        assert!(cache.peek(&key("b")).is_none());
        assert!(cache.peek(&key("c")).is_some());
        assert_eq!(cache.bytes(), 800);
    }

    #[test]
    fn test_oversized_image_not_retained() {
        let cache = MemoryImageCache::new(10, 100);
        cache.put(key("a"), rgba(1, 1));
        cache.put(key("a"), rgba(10, 10));

        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_reclaim_drops_oldest_first() {
        let cache = MemoryImageCache::new(10, 1024 * 1024);
        cache.put(key("a"), rgba(10, 10));
        cache.put(key("b"), rgba(10, 10));
        cache.put(key("c"), rgba(10, 10));

        let dropped = cache.reclaim(400);

        assert_eq!(dropped, 2);
        assert!(cache.peek(&key("a")).is_none());
        assert!(cache.peek(&key("b")).is_none());
        assert!(cache.peek(&key("c")).is_some());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = MemoryImageCache::new(10, 1024 * 1024);
        cache.put(key("a"), rgba(1, 1));
        cache.put(key("b"), rgba(1, 1));

        assert!(cache.remove(&key("a")));
        assert!(!cache.remove(&key("a")));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_stats() {
        let cache = MemoryImageCache::new(10, 1024 * 1024);
        cache.put(key("a"), rgba(1, 1));

        let _ = cache.get(&key("a"));
        let _ = cache.get(&key("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_peek_does_not_promote() {
        let cache = MemoryImageCache::new(2, 1024 * 1024);
        cache.put(key("a"), rgba(1, 1));
        cache.put(key("b"), rgba(1, 1));

        let _ = cache.peek(&key("a"));
        cache.put(key("c"), rgba(1, 1));

        assert!(cache.peek(&key("a")).is_none());
    }

    #[test]
    fn test_concurrent_puts_leave_one_payload() {
        let cache = Arc::new(MemoryImageCache::new(10, 1024 * 1024));
        let handles: Vec<_> = (1..=8u32)
            .map(|n| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.put(key("same"), rgba(n, n)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let img = cache.get(&key("same")).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.bytes(), img.as_bytes().len());
    }
}
