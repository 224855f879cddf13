//! Disk-based image cache for persistence across sessions.
//!
//! Layout is a flat directory `<root>/web_image_cache/` holding one PNG file per
//! key, named exactly by the key. There is no index: the directory listing is
//! the index. Regular files whose names start with `.write-` belong to the
//! writer and are not entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::errors::{CacheError, CacheResult};

use super::disk_writer::{DiskWriter, TEMP_FILE_PREFIX, WriteCommand};

/// Name of the cache directory created under the root hint.
pub const DISK_CACHE_DIR: &str = "web_image_cache";

/// Default number of writes that may be queued before `put` waits.
pub const DEFAULT_WRITE_QUEUE_CAPACITY: usize = 64;

/// Disk-backed image cache with synchronous reads and queued writes.
///
/// If the cache directory cannot be created the tier is disabled for its
/// whole lifetime: reads miss and writes, removals and clears do nothing.
pub struct DiskImageCache {
    cache_dir: PathBuf,
    write_tx: Option<mpsc::Sender<WriteCommand>>,
}

impl DiskImageCache {
    /// Creates the disk tier under `<root_hint>/web_image_cache/` and starts
    /// its writer. Must be called from within a tokio runtime.
    pub async fn new(root_hint: &Path, queue_capacity: usize) -> Self {
        let cache_dir = root_hint.join(DISK_CACHE_DIR);

        match fs::create_dir_all(&cache_dir).await {
            Ok(()) => {
                info!(path = %cache_dir.display(), "Disk image cache ready");
                let write_tx = DiskWriter::spawn(cache_dir.clone(), queue_capacity);
                Self {
                    cache_dir,
                    write_tx: Some(write_tx),
                }
            }
            Err(e) => {
                let err = CacheError::DiskUnavailable {
                    path: cache_dir.display().to_string(),
                    message: e.to_string(),
                };
                warn!(error = %err, "Disk image cache disabled, using memory only");
                Self {
                    cache_dir,
                    write_tx: None,
                }
            }
        }
    }

    /// Returns true unless the tier fell back to degraded mode.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.write_tx.is_some()
    }

    /// Directory holding the cached files.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path for a cached image.
    fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.as_str())
    }

    /// Loads and decodes an image on the calling task.
    ///
    /// A missing file is a miss. An unreadable or corrupt file is logged and
    /// also reported as a miss; the file is left in place.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<image::DynamicImage>> {
        if !self.is_enabled() {
            return None;
        }

        let path = self.cache_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(key = %key, "Disk cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cached image");
                return None;
            }
        };

        trace!(key = %key, path = %path.display(), "Disk cache hit");

        let result = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await;

        match result {
            Ok(Ok(img)) => {
                debug!(key = %key, "Decoded image from disk cache");
                Some(Arc::new(img))
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Failed to decode cached image");
                None
            }
            Err(e) => {
                error!(key = %key, error = %e, "Decode task panicked");
                None
            }
        }
    }

    /// Queues an encode-and-write of `image` under `key`.
    ///
    /// Returns once the write is queued, not once it is on disk. Waits only
    /// when the queue is full.
    pub async fn put(&self, key: CacheKey, image: Arc<image::DynamicImage>) {
        if let Some(slot) = self.reserve().await {
            slot.write(key, image);
        }
    }

    /// Waits for room in the write queue and holds it.
    ///
    /// Returns `None` when the tier is disabled or the writer is gone.
    pub(crate) async fn reserve(&self) -> Option<WriteSlot<'_>> {
        let tx = self.write_tx.as_ref()?;
        match tx.reserve().await {
            Ok(permit) => Some(WriteSlot { permit }),
            Err(_) => {
                warn!(error = %CacheError::WorkerStopped, "Dropped disk cache write");
                None
            }
        }
    }

    /// Waits until every write queued before this call has been processed.
    ///
    /// # Errors
    /// Returns `CacheError::WorkerStopped` if the writer is gone.
    pub async fn flush(&self) -> CacheResult<()> {
        let Some(tx) = &self.write_tx else {
            return Ok(());
        };

        let (done, flushed) = oneshot::channel();
        tx.send(WriteCommand::Flush { done })
            .await
            .map_err(|_| CacheError::WorkerStopped)?;
        flushed.await.map_err(|_| CacheError::WorkerStopped)
    }

    /// Removes an image from disk. Returns true if a file was deleted.
    ///
    /// A write for the same key that is still queued will recreate the file.
    pub async fn remove(&self, key: &CacheKey) -> bool {
        if !self.is_enabled() {
            return false;
        }

        match fs::remove_file(self.cache_path(key)).await {
            Ok(()) => {
                debug!(key = %key, "Removed image from disk cache");
                true
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(key = %key, error = %e, "Failed to remove from disk cache");
                }
                false
            }
        }
    }

    /// Deletes every cached file, continuing past failures.
    /// Returns the number of files deleted.
    pub async fn clear(&self) -> usize {
        if !self.is_enabled() {
            return 0;
        }

        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.cache_dir.display(), error = %e, "Failed to read cache dir");
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read cache dir entry");
                    break;
                }
            };

            if !is_cache_entry(&entry).await {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cache file"),
            }
        }

        debug!(removed, "Cleared disk cache");
        removed
    }

    /// Checks if an image is on disk.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        if !self.is_enabled() {
            return false;
        }
        fs::try_exists(self.cache_path(key)).await.unwrap_or(false)
    }

    /// Returns the number of cached files.
    pub async fn len(&self) -> usize {
        if !self.is_enabled() {
            return 0;
        }

        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return 0;
        };

        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if is_cache_entry(&entry).await {
                count += 1;
            }
        }
        count
    }

    /// Returns true if no files are cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn is_cache_entry(entry: &fs::DirEntry) -> bool {
    !entry
        .file_name()
        .to_string_lossy()
        .starts_with(TEMP_FILE_PREFIX)
        && entry.file_type().await.is_ok_and(|t| t.is_file())
}

/// A reserved place in the write queue. Dropping it releases the place.
pub(crate) struct WriteSlot<'a> {
    permit: mpsc::Permit<'a, WriteCommand>,
}

impl WriteSlot<'_> {
    /// Queues the write without waiting.
    pub(crate) fn write(self, key: CacheKey, image: Arc<image::DynamicImage>) {
        trace!(key = %key, "Queueing disk cache write");
        self.permit.send(WriteCommand::Write { key, image });
    }
}

impl std::fmt::Debug for DiskImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskImageCache")
            .field("cache_dir", &self.cache_dir)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Returns the platform cache directory used as the default root hint
/// (e.g. `~/.cache/webimage`).
#[must_use]
pub fn default_cache_root() -> PathBuf {
    directories::ProjectDirs::from("com", "linuxmobile", "webimage").map_or_else(
        || std::env::temp_dir().join("webimage").join("cache"),
        |dirs| dirs.cache_dir().to_path_buf(),
    )
}
