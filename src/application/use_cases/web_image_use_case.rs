//! Cached web image use case.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::entities::{ImageSource, LoadedImage};
use crate::domain::ports::{ImageCachePort, ImageFetcherPort};

/// Serves images from the cache, fetching and caching them on a full miss.
#[derive(Clone)]
pub struct WebImageUseCase {
    cache: Arc<dyn ImageCachePort>,
    fetcher: Arc<dyn ImageFetcherPort>,
}

impl WebImageUseCase {
    /// Creates new use case around an explicitly constructed cache.
    #[must_use]
    pub const fn new(cache: Arc<dyn ImageCachePort>, fetcher: Arc<dyn ImageFetcherPort>) -> Self {
        Self { cache, fetcher }
    }

    /// Returns the image for `identifier`, from cache if possible.
    ///
    /// Fetch failures and invalid identifiers are logged and reported as
    /// `None`; cache problems are never surfaced.
    pub async fn get_or_fetch(&self, identifier: &str) -> Option<LoadedImage> {
        if identifier.is_empty() {
            return None;
        }

        if let Some(loaded) = self.cache.get(identifier).await {
            debug!(key = %loaded.key, source = %loaded.source, "Image served from cache");
            return Some(loaded);
        }

        let image = match self.fetcher.fetch(identifier).await {
            Ok(image) => Arc::new(image),
            Err(e) => {
                warn!(identifier, error = %e, "Failed to fetch image");
                return None;
            }
        };

        match self.cache.put(identifier, image.clone()).await {
            Ok(key) => {
                debug!(key = %key, source = %ImageSource::Network, "Image fetched and cached");
                Some(LoadedImage::new(key, image, ImageSource::Network))
            }
            Err(e) => {
                warn!(identifier, error = %e, "Fetched image could not be cached");
                None
            }
        }
    }

    /// Drops `identifier` from every cache tier.
    pub async fn remove_from_cache(&self, identifier: &str) {
        self.cache.remove(identifier).await;
    }
}
