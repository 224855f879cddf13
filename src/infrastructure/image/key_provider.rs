//! Cache key providers.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::domain::entities::{CacheKey, MAX_KEY_LEN};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::CacheKeyProvider;

/// Character substituted for every forbidden character.
pub const PLACEHOLDER: char = '+';

static FORBIDDEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.:/,%?&=\\]").expect("static regex is valid"));

static PLACEHOLDER_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\++").expect("static regex is valid"));

/// Default provider: keeps keys readable by rewriting path and query
/// punctuation to `+` and collapsing runs of `+` into one.
///
/// `https://x.test/a.png` becomes `https+x+test+a+png`. A result longer than
/// [`MAX_KEY_LEN`] is cut short and suffixed with the identifier's digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct SanitizingKeyProvider;

impl CacheKeyProvider for SanitizingKeyProvider {
    fn cache_key(&self, identifier: &str) -> CacheResult<CacheKey> {
        if identifier.is_empty() {
            return Err(CacheError::invalid_identifier("identifier is empty"));
        }

        let placeholder = PLACEHOLDER.to_string();
        let replaced = FORBIDDEN_RE.replace_all(identifier, placeholder.as_str());
        let collapsed = PLACEHOLDER_RUN_RE.replace_all(&replaced, placeholder.as_str());

        if collapsed.len() <= MAX_KEY_LEN {
            return CacheKey::parse(collapsed.into_owned());
        }

        let digest = digest_hex(identifier);
        let mut end = MAX_KEY_LEN - digest.len() - 1;
        while !collapsed.is_char_boundary(end) {
            end -= 1;
        }
        let prefix = collapsed[..end].trim_end_matches(PLACEHOLDER);

        CacheKey::parse(format!("{prefix}{PLACEHOLDER}{digest}"))
    }
}

/// First 16 bytes of the SHA-256 digest of `identifier`, hex encoded.
fn digest_hex(identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// Hash-based provider: first 16 bytes of the SHA-256 digest, hex encoded.
///
/// Keys are opaque but fixed-length and collision resistant.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedKeyProvider;

impl CacheKeyProvider for HashedKeyProvider {
    fn cache_key(&self, identifier: &str) -> CacheResult<CacheKey> {
        if identifier.is_empty() {
            return Err(CacheError::invalid_identifier("identifier is empty"));
        }

        CacheKey::parse(digest_hex(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://x.test/a.png", "https+x+test+a+png" ; "simple_url")]
    #[test_case("http://h/p?a=1&b=2", "http+h+p+a+1+b+2" ; "query_string")]
    #[test_case("a%20b,c", "a+20b+c" ; "percent_and_comma")]
    #[test_case("a++b", "a+b" ; "existing_placeholders_collapse")]
    #[test_case("C:\\img\\x.png", "C+img+x+png" ; "backslash_separator")]
    #[test_case("plain", "plain" ; "no_forbidden_chars")]
    #[test_case("..", "+" ; "dot_dot")]
    fn test_sanitizing_key(identifier: &str, expected: &str) {
        let key = SanitizingKeyProvider.cache_key(identifier).unwrap();
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn test_sanitizing_key_is_deterministic() {
        let url = "https://cdn.example.com/images/cat.png?size=large";
        assert_eq!(
            SanitizingKeyProvider.cache_key(url).unwrap(),
            SanitizingKeyProvider.cache_key(url).unwrap()
        );
    }

    #[test]
    fn test_sanitizing_key_distinguishes_non_forbidden_differences() {
        let a = SanitizingKeyProvider
            .cache_key("https://x.test/a.png")
            .unwrap();
        let b = SanitizingKeyProvider
            .cache_key("https://x.test/b.png")
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitizing_key_never_contains_forbidden_chars() {
        let key = SanitizingKeyProvider
            .cache_key("https://a.b/c/d.e?f=g&h=i,j%k")
            .unwrap();
        assert!(!key.as_str().contains(['.', ':', '/', ',', '%', '?', '&', '=', '\\']));
        assert!(!key.as_str().contains("++"));
    }

    #[test]
    fn test_long_identifier_is_shortened_with_digest() {
        let url = format!("https://cdn.example.com/img.png?sig={}", "a".repeat(300));
        let key = SanitizingKeyProvider.cache_key(&url).unwrap();

        assert!(key.as_str().len() <= MAX_KEY_LEN);
        assert!(key.as_str().starts_with("https+cdn+example+com+img+png+sig+aaa"));
        assert!(key.as_str().ends_with(HashedKeyProvider.cache_key(&url).unwrap().as_str()));
        assert_eq!(SanitizingKeyProvider.cache_key(&url).unwrap(), key);
    }

    #[test]
    fn test_long_identifiers_sharing_a_prefix_stay_distinct() {
        let base = format!("https://cdn.example.com/{}", "p".repeat(400));
        let a = SanitizingKeyProvider.cache_key(&format!("{base}/a.png")).unwrap();
        let b = SanitizingKeyProvider.cache_key(&format!("{base}/b.png")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_long_multibyte_identifier_cuts_on_char_boundary() {
        let url = format!("https://x.test/{}", "é".repeat(200));
        let key = SanitizingKeyProvider.cache_key(&url).unwrap();
        assert!(key.as_str().len() <= MAX_KEY_LEN);
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(matches!(
            SanitizingKeyProvider.cache_key(""),
            Err(CacheError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            HashedKeyProvider.cache_key(""),
            Err(CacheError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_hashed_key_shape() {
        let key = HashedKeyProvider
            .cache_key("https://example.com/image.png")
            .unwrap();
        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hashed_key_separates_placeholder_collisions() {
        let a = HashedKeyProvider.cache_key("a.b").unwrap();
        let b = HashedKeyProvider.cache_key("a/b").unwrap();
        assert_ne!(a, b);
    }
}
