//! Port definition for fetching images on a full cache miss.

use async_trait::async_trait;

use crate::domain::errors::CacheResult;

/// Retrieves and decodes an image for a source identifier.
#[async_trait]
pub trait ImageFetcherPort: Send + Sync {
    /// Fetches and decodes the image behind `identifier`.
    ///
    /// # Errors
    /// Returns `CacheError::Fetch` on transport failure or bad status, and
    /// `CacheError::Decode` if the payload is not a supported image.
    async fn fetch(&self, identifier: &str) -> CacheResult<image::DynamicImage>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::errors::CacheError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock fetcher that serves a fixed image or a fixed failure.
    pub struct MockImageFetcher {
        image: Option<image::DynamicImage>,
        calls: AtomicUsize,
    }

    impl MockImageFetcher {
        /// Creates a fetcher that always returns `image`.
        pub fn serving(image: image::DynamicImage) -> Self {
            Self {
                image: Some(image),
                calls: AtomicUsize::new(0),
            }
        }

        /// Creates a fetcher that always fails.
        pub fn failing() -> Self {
            Self {
                image: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Number of times `fetch` was called.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageFetcherPort for MockImageFetcher {
        async fn fetch(&self, identifier: &str) -> CacheResult<image::DynamicImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.image
                .clone()
                .ok_or_else(|| CacheError::fetch(format!("no route to {identifier}")))
        }
    }
}
