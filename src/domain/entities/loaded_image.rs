//! Loaded image entity.

use std::sync::Arc;

use super::CacheKey;

/// Where an image was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Loaded from the in-memory LRU tier.
    MemoryCache,
    /// Loaded from the disk tier and promoted to memory.
    DiskCache,
    /// Fetched from the network.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory"),
            Self::DiskCache => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A decoded image together with its cache key and origin.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Key the image is stored under.
    pub key: CacheKey,
    /// The decoded raster.
    pub image: Arc<image::DynamicImage>,
    /// Tier or collaborator that produced the image.
    pub source: ImageSource,
}

impl LoadedImage {
    /// Creates a new loaded image.
    #[must_use]
    pub const fn new(key: CacheKey, image: Arc<image::DynamicImage>, source: ImageSource) -> Self {
        Self { key, image, source }
    }

    /// Returns true if the image was served by one of the cache tiers.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        matches!(self.source, ImageSource::MemoryCache | ImageSource::DiskCache)
    }
}

/// Size in bytes of the decoded pixel buffer.
#[must_use]
pub fn decoded_size(image: &image::DynamicImage) -> usize {
    image.as_bytes().len()
}
