//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::args::CliArgs;
use crate::infrastructure::image::{HttpFetcherConfig, ImageCacheConfig, TlsConfig};

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warning level.
    #[default]
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, loaded from `config.toml` and overridden by CLI flags.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheSection,

    /// HTTP fetcher configuration.
    #[serde(default)]
    pub http: HttpSection,
}

/// `[cache]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    /// Root under which `web_image_cache/` is created.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Maximum images held in memory.
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,

    /// Maximum decoded bytes held in memory.
    #[serde(default = "default_memory_max_bytes")]
    pub memory_max_bytes: usize,

    /// Disk writes that may be queued before callers wait.
    #[serde(default = "default_write_queue_capacity")]
    pub write_queue_capacity: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            cache_dir: None,
            memory_max_entries: default_memory_max_entries(),
            memory_max_bytes: default_memory_max_bytes(),
            write_queue_capacity: default_write_queue_capacity(),
        }
    }
}

/// `[http]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSection {
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// PEM files with extra trusted root certificates.
    #[serde(default)]
    pub extra_root_certificates: Vec<PathBuf>,

    /// Disable certificate verification.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            extra_root_certificates: Vec::new(),
            accept_invalid_certs: false,
        }
    }
}

fn default_memory_max_entries() -> usize {
    crate::infrastructure::image::memory_cache::DEFAULT_MAX_ENTRIES
}

fn default_memory_max_bytes() -> usize {
    crate::infrastructure::image::memory_cache::DEFAULT_MAX_BYTES
}

fn default_write_queue_capacity() -> usize {
    crate::infrastructure::image::disk_cache::DEFAULT_WRITE_QUEUE_CAPACITY
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_read_timeout_secs() -> u64 {
    10
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.cache_dir = Some(cache_dir.clone());
        }
    }

    /// Builds the cache configuration.
    #[must_use]
    pub fn image_cache_config(&self) -> ImageCacheConfig {
        ImageCacheConfig {
            cache_dir: self.cache.cache_dir.clone(),
            memory_max_entries: self.cache.memory_max_entries,
            memory_max_bytes: self.cache.memory_max_bytes,
            write_queue_capacity: self.cache.write_queue_capacity,
        }
    }

    /// Builds the HTTP fetcher configuration.
    #[must_use]
    pub fn http_fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.http.read_timeout_secs),
            tls: TlsConfig {
                root_certificates: self.http.extra_root_certificates.clone(),
                accept_invalid_certs: self.http.accept_invalid_certs,
            },
            use_system_proxy: true,
        }
    }
}
