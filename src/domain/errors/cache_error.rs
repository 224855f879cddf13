//! Cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while deriving keys, touching a cache tier, or fetching.
///
/// Only `InvalidIdentifier` crosses the orchestrator boundary; every other
/// variant is absorbed by the tier that produced it and logged.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("invalid identifier: {reason}")]
    InvalidIdentifier { reason: String },

    #[error("invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("disk cache unavailable at {path}: {message}")]
    DiskUnavailable { path: String, message: String },

    #[error("failed to decode image: {message}")]
    Decode { message: String },

    #[error("failed to encode image: {message}")]
    Encode { message: String },

    #[error("io error: {message}")]
    Io { message: String },

    #[error("fetch failed: {message}")]
    Fetch { message: String },

    #[error("disk writer has stopped")]
    WorkerStopped,
}

impl CacheError {
    /// Creates invalid identifier error.
    #[must_use]
    pub fn invalid_identifier(reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            reason: reason.into(),
        }
    }

    /// Creates invalid key error.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates encode error.
    #[must_use]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Creates io error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates fetch error.
    #[must_use]
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    /// Returns true if the caller supplied bad input.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidIdentifier { .. } | Self::InvalidKey { .. })
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}
