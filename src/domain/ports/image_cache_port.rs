//! Port definition for image caching.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::{CacheKey, LoadedImage};
use crate::domain::errors::CacheResult;

/// Port for image caching operations, keyed by source identifier.
/// Implementations must be thread-safe.
#[async_trait]
pub trait ImageCachePort: Send + Sync {
    /// Attempts to get an image from the cache.
    /// Returns None on a miss or for an empty identifier.
    async fn get(&self, identifier: &str) -> Option<LoadedImage>;

    /// Stores an image in the cache, replacing any previous entry, and returns
    /// the key it was stored under.
    ///
    /// # Errors
    /// Returns `CacheError::InvalidIdentifier` if no key can be derived.
    async fn put(&self, identifier: &str, image: Arc<image::DynamicImage>)
    -> CacheResult<CacheKey>;

    /// Removes an image from every tier. Unknown identifiers are a no-op.
    async fn remove(&self, identifier: &str);

    /// Clears all images from every tier.
    async fn clear(&self);
}
