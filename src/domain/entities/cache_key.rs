//! Cache key entity.

use crate::domain::errors::{CacheError, CacheResult};

/// Longest key in bytes. Most filesystems cap a single name at 255 bytes.
pub const MAX_KEY_LEN: usize = 255;

/// Filesystem- and map-safe key derived from a source identifier.
///
/// A key is always usable as a single path segment: it is never empty,
/// never `.` or `..`, never longer than [`MAX_KEY_LEN`] bytes, and never
/// contains a path separator or NUL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validates a candidate key.
    ///
    /// # Errors
    /// Returns `CacheError::InvalidKey` if the value cannot be used as a single
    /// file name inside the cache root.
    pub fn parse(value: impl Into<String>) -> CacheResult<Self> {
        let value = value.into();

        if value.is_empty() {
            return Err(CacheError::invalid_key(value, "key is empty"));
        }
        if value == "." || value == ".." {
            return Err(CacheError::invalid_key(value, "key is a relative path component"));
        }
        if value.len() > MAX_KEY_LEN {
            return Err(CacheError::invalid_key(
                value,
                format!("key is longer than {MAX_KEY_LEN} bytes"),
            ));
        }
        if value.contains(['/', '\\', '\0']) {
            return Err(CacheError::invalid_key(
                value,
                "key contains a path separator or NUL",
            ));
        }

        Ok(Self(value))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = CacheError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
