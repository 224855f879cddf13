//! Background writer for the disk tier.
//!
//! A single task drains a bounded queue, encoding and writing one image at a
//! time. A failed task is logged and skipped; the worker keeps going until
//! every sender has been dropped.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::errors::{CacheError, CacheResult};

/// Name prefix of in-flight temp files in the cache directory.
pub(crate) const TEMP_FILE_PREFIX: &str = ".write-";

/// Work item for the disk writer.
#[derive(Debug)]
pub(crate) enum WriteCommand {
    /// Encode `image` as PNG and store it under `key`.
    Write {
        key: CacheKey,
        image: Arc<image::DynamicImage>,
    },
    /// Acknowledge once every earlier command has been processed.
    Flush { done: oneshot::Sender<()> },
}

/// State owned by the writer task.
pub(crate) struct DiskWriter {
    cache_dir: PathBuf,
    rx: mpsc::Receiver<WriteCommand>,
}

impl DiskWriter {
    /// Spawns the writer on the current runtime and returns its queue.
    pub(crate) fn spawn(cache_dir: PathBuf, capacity: usize) -> mpsc::Sender<WriteCommand> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let writer = Self { cache_dir, rx };
        tokio::spawn(writer.run());
        tx
    }

    async fn run(mut self) {
        debug!(path = %self.cache_dir.display(), "Disk writer started");

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                WriteCommand::Write { key, image } => {
                    match write_image(self.cache_dir.clone(), key.clone(), image).await {
                        Ok(size) => {
                            debug!(key = %key, size, "Stored image in disk cache");
                        }
                        Err(e @ CacheError::Encode { .. }) => {
                            warn!(key = %key, error = %e, "Failed to encode image for disk cache");
                        }
                        Err(e) => {
                            warn!(key = %key, error = %e, "Failed to write image to disk cache");
                        }
                    }
                }
                WriteCommand::Flush { done } => {
                    trace!("Disk writer flush");
                    let _ = done.send(());
                }
            }
        }

        debug!(path = %self.cache_dir.display(), "Disk writer stopped");
    }
}

/// Encodes and writes one image off the async runtime.
/// Returns the number of bytes written.
async fn write_image(
    cache_dir: PathBuf,
    key: CacheKey,
    image: Arc<image::DynamicImage>,
) -> CacheResult<usize> {
    tokio::task::spawn_blocking(move || -> CacheResult<usize> {
        let bytes = encode_png(&image)?;
        persist(&cache_dir, &key, &bytes)?;
        Ok(bytes.len())
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Disk write task panicked");
        CacheError::io(format!("write task panicked: {e}"))
    })?
}

/// Encodes an image as PNG.
///
/// # Errors
/// Returns `CacheError::Encode` if the pixel format cannot be stored as PNG.
pub(crate) fn encode_png(image: &image::DynamicImage) -> CacheResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| CacheError::encode(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Writes `bytes` to `<cache_dir>/<key>` through a temporary file so readers
/// never see a partial image.
fn persist(cache_dir: &Path, key: &CacheKey, bytes: &[u8]) -> CacheResult<()> {
    let mut temp_file = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile_in(cache_dir)
        .map_err(|e| CacheError::io(format!("failed to create temp file: {e}")))?;

    temp_file
        .write_all(bytes)
        .map_err(|e| CacheError::io(format!("failed to write cache file: {e}")))?;

    temp_file
        .persist(cache_dir.join(key.as_str()))
        .map_err(|e| CacheError::io(format!("failed to persist cache file: {}", e.error)))?;

    Ok(())
}
