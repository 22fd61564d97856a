//! Content addressed names for subset artifacts.

use std::fmt::Display;

/// Identifies one (family, text) request.
///
/// The text is hashed as given, so "AB" and "BA" are different keys even
/// though they need the same glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: blake3::Hash,
}

impl CacheKey {
    pub fn new(family: &str, text: &str) -> CacheKey {
        let mut b3 = blake3::Hasher::new();
        b3.update(family.as_bytes());
        // a family can't contain NUL so ("ab", "c") and ("a", "bc") differ
        b3.update(&[0]);
        b3.update(text.as_bytes());
        CacheKey {
            hash: b3.finalize(),
        }
    }

    /// Lowercase hex, 64 characters.
    pub fn hex(&self) -> String {
        self.hash.to_hex().to_string()
    }

    pub fn file_name(&self) -> String {
        format!("{}.woff", self.hex())
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash.to_hex())
    }
}
