//! Infrastructure layer with cache, network, and configuration adapters.

/// Application configuration.
pub mod config;
/// Image handling (key derivation, caching, fetching).
pub mod image;

pub use config::{AppConfig, CliArgs, Command, LogLevel, StorageManager};
pub use self::image::{
    CacheStats, DiskImageCache, HashedKeyProvider, HttpFetcherConfig, HttpImageFetcher,
    ImageCache, ImageCacheConfig, MemoryImageCache, SanitizingKeyProvider, TlsConfig,
};
