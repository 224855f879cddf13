//! Image handling infrastructure.
//!
//! This module provides:
//! - Cache key derivation
//! - Memory caching with LRU eviction
//! - Disk caching with a single background writer
//! - The two-tier cache that composes both
//! - HTTP fetching for full misses

pub mod cache;
pub mod disk_cache;
mod disk_writer;
pub mod fetcher;
pub mod key_provider;
pub mod memory_cache;

pub use cache::{ImageCache, ImageCacheConfig};
pub use disk_cache::{DISK_CACHE_DIR, DiskImageCache, default_cache_root};
pub use fetcher::{HttpFetcherConfig, HttpImageFetcher, TlsConfig};
pub use key_provider::{HashedKeyProvider, SanitizingKeyProvider};
pub use memory_cache::{CacheStats, MemoryImageCache};
