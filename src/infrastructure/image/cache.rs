//! Two-tier image cache: memory first, then disk, with promotion on disk hits.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::domain::entities::{CacheKey, ImageSource, LoadedImage};
use crate::domain::errors::CacheResult;
use crate::domain::ports::{CacheKeyProvider, ImageCachePort};

use super::disk_cache::{DEFAULT_WRITE_QUEUE_CAPACITY, DiskImageCache, default_cache_root};
use super::key_provider::SanitizingKeyProvider;
use super::memory_cache::{CacheStats, DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES, MemoryImageCache};

/// Configuration for [`ImageCache`].
#[derive(Debug, Clone)]
pub struct ImageCacheConfig {
    /// Root under which `web_image_cache/` is created. Defaults to the
    /// platform cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Maximum images held in memory.
    pub memory_max_entries: usize,
    /// Maximum decoded bytes held in memory.
    pub memory_max_bytes: usize,
    /// Disk writes that may be queued before `put` waits.
    pub write_queue_capacity: usize,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            memory_max_entries: DEFAULT_MAX_ENTRIES,
            memory_max_bytes: DEFAULT_MAX_BYTES,
            write_queue_capacity: DEFAULT_WRITE_QUEUE_CAPACITY,
        }
    }
}

/// Memory + disk image cache keyed by source identifier.
///
/// Construct one per process and share it behind an `Arc`.
pub struct ImageCache {
    key_provider: Arc<dyn CacheKeyProvider>,
    memory: MemoryImageCache,
    disk: DiskImageCache,
    // Orders memory writes with their disk enqueue so both tiers agree on
    // the last writer of a key.
    write_order: Mutex<()>,
}

impl ImageCache {
    /// Creates a cache with the given configuration and key provider.
    /// Must be called from within a tokio runtime.
    pub async fn new(config: &ImageCacheConfig, key_provider: Arc<dyn CacheKeyProvider>) -> Self {
        let root = config.cache_dir.clone().unwrap_or_else(default_cache_root);
        let disk = DiskImageCache::new(&root, config.write_queue_capacity).await;
        let memory = MemoryImageCache::new(config.memory_max_entries, config.memory_max_bytes);

        info!(
            disk_enabled = disk.is_enabled(),
            memory_max_entries = config.memory_max_entries,
            memory_max_bytes = config.memory_max_bytes,
            "Image cache initialized"
        );

        Self {
            key_provider,
            memory,
            disk,
            write_order: Mutex::new(()),
        }
    }

    /// Creates a cache with default configuration and the sanitizing key provider.
    pub async fn with_defaults() -> Self {
        Self::new(&ImageCacheConfig::default(), Arc::new(SanitizingKeyProvider)).await
    }

    /// Derives the key for `identifier` through the configured provider.
    ///
    /// # Errors
    /// Returns the provider's error for an unusable identifier.
    pub fn cache_key(&self, identifier: &str) -> CacheResult<CacheKey> {
        self.key_provider.cache_key(identifier)
    }

    /// Memory tier.
    #[must_use]
    pub const fn memory(&self) -> &MemoryImageCache {
        &self.memory
    }

    /// Disk tier.
    #[must_use]
    pub const fn disk(&self) -> &DiskImageCache {
        &self.disk
    }

    /// Returns false when running memory-only.
    #[must_use]
    pub const fn is_disk_enabled(&self) -> bool {
        self.disk.is_enabled()
    }

    /// Returns memory tier statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.memory.stats()
    }

    /// Waits for every queued disk write to finish.
    ///
    /// # Errors
    /// Returns `CacheError::WorkerStopped` if the disk writer is gone.
    pub async fn flush(&self) -> CacheResult<()> {
        self.disk.flush().await
    }

    /// Copies a disk hit into memory unless a newer `put` got there first.
    async fn promote(&self, key: &CacheKey, image: &Arc<image::DynamicImage>) {
        let _guard = self.write_order.lock().await;
        if self.memory.peek(key).is_none() {
            self.memory.put(key.clone(), image.clone());
            trace!(key = %key, "Promoted disk hit to memory");
        }
    }
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("memory", &self.memory)
            .field("disk", &self.disk)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ImageCachePort for ImageCache {
    async fn get(&self, identifier: &str) -> Option<LoadedImage> {
        if identifier.is_empty() {
            return None;
        }

        let key = match self.key_provider.cache_key(identifier) {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Cannot derive cache key, treating as miss");
                return None;
            }
        };

        if let Some(img) = self.memory.get(&key) {
            return Some(LoadedImage::new(key, img, ImageSource::MemoryCache));
        }

        let img = self.disk.get(&key).await?;
        self.promote(&key, &img).await;
        Some(LoadedImage::new(key, img, ImageSource::DiskCache))
    }

    async fn put(
        &self,
        identifier: &str,
        image: Arc<image::DynamicImage>,
    ) -> CacheResult<CacheKey> {
        let key = self.key_provider.cache_key(identifier)?;

        // Queue space is taken before the lock so readers never wait on the writer.
        let slot = self.disk.reserve().await;

        let _guard = self.write_order.lock().await;
        self.memory.put(key.clone(), image.clone());
        if let Some(slot) = slot {
            slot.write(key.clone(), image);
        }

        Ok(key)
    }

    async fn remove(&self, identifier: &str) {
        let Ok(key) = self.key_provider.cache_key(identifier) else {
            return;
        };

        let _guard = self.write_order.lock().await;
        self.memory.remove(&key);
        self.disk.remove(&key).await;
        debug!(key = %key, "Removed image from cache");
    }

    async fn clear(&self) {
        let _guard = self.write_order.lock().await;
        self.memory.clear();
        let removed = self.disk.clear().await;
        info!(removed_files = removed, "Cleared all image caches");
    }
}
