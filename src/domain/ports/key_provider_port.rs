//! Port definition for cache key derivation.

use crate::domain::entities::CacheKey;
use crate::domain::errors::CacheResult;

/// Maps an opaque source identifier (usually a URL) to a [`CacheKey`].
///
/// Implementations must be pure and deterministic. The cache only ever calls
/// through this trait, so a provider can be swapped wholesale.
pub trait CacheKeyProvider: Send + Sync {
    /// Derives the cache key for `identifier`.
    ///
    /// # Errors
    /// Returns `CacheError::InvalidIdentifier` for an empty identifier, or
    /// `CacheError::InvalidKey` if the derived value is not a safe path segment.
    fn cache_key(&self, identifier: &str) -> CacheResult<CacheKey>;
}

impl<F> CacheKeyProvider for F
where
    F: Fn(&str) -> CacheResult<CacheKey> + Send + Sync,
{
    fn cache_key(&self, identifier: &str) -> CacheResult<CacheKey> {
        self(identifier)
    }
}
