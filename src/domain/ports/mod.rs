mod image_cache_port;
mod image_fetcher_port;
mod key_provider_port;

pub use image_cache_port::ImageCachePort;
pub use image_fetcher_port::ImageFetcherPort;
pub use key_provider_port::CacheKeyProvider;

#[cfg(test)]
pub mod mocks {
    pub use super::image_fetcher_port::mock::MockImageFetcher;
}
