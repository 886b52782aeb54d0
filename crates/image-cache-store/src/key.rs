//! Cache key validation

use crate::error::{Result, StoreError};
use std::fmt;

/// Longest accepted key, leaving room for the `.jpg` suffix in a 255-byte
/// file name.
const MAX_KEY_LEN: usize = 200;

/// A client-supplied token that is safe to use as a file name stem.
///
/// Keys are usually HTTP status codes, but any token is accepted as long as
/// it cannot escape the cache directory: no separators, no NUL, and not one
/// of the `.` / `..` directory entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Validate a raw key as taken from the request path.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(StoreError::InvalidKey("key is empty".to_string()));
        }
        if raw.len() > MAX_KEY_LEN {
            return Err(StoreError::InvalidKey(format!(
                "key is longer than {} bytes",
                MAX_KEY_LEN
            )));
        }
        if raw == "." || raw == ".." {
            return Err(StoreError::InvalidKey(format!(
                "{:?} is a directory entry",
                raw
            )));
        }
        if raw.contains(['/', '\\', '\0']) {
            return Err(StoreError::InvalidKey(format!(
                "{:?} contains a path separator or NUL",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_code() {
        let key = CacheKey::parse("404").unwrap();
        assert_eq!(key.as_str(), "404");
        assert_eq!(key.to_string(), "404");
    }

    #[test]
    fn test_parse_non_numeric_token() {
        assert!(CacheKey::parse("teapot").is_ok());
        assert!(CacheKey::parse("a..b").is_ok());
        assert!(CacheKey::parse(".hidden").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert!(CacheKey::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(CacheKey::parse("..").is_err());
        assert!(CacheKey::parse(".").is_err());
        assert!(CacheKey::parse("../etc/passwd").is_err());
        assert!(CacheKey::parse("a/b").is_err());
        assert!(CacheKey::parse("..\\windows").is_err());
        assert!(CacheKey::parse("nul\0byte").is_err());
    }

    #[test]
    fn test_parse_length_limit() {
        assert!(CacheKey::parse(&"9".repeat(MAX_KEY_LEN)).is_ok());
        let err = CacheKey::parse(&"9".repeat(MAX_KEY_LEN + 1)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
