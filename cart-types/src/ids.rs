//! Identity types for cart-sync.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier selecting which site/session cart is active.
///
/// A manager created without a key uses [`CartKey::NO_SITE`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartKey(String);

impl CartKey {
    /// Key used when no site is selected.
    pub const NO_SITE: &'static str = "no-site";

    /// Create a key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Create a key from an optional value, falling back to `no-site`.
    ///
    /// Empty strings are treated the same as a missing key.
    pub fn from_optional(key: Option<&str>) -> Self {
        match key {
            Some(k) if !k.is_empty() => Self::new(k),
            _ => Self::default(),
        }
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this is the `no-site` fallback key.
    pub fn is_no_site(&self) -> bool {
        self.0 == Self::NO_SITE
    }

    /// A filesystem-safe form of the key.
    ///
    /// Anything outside `[A-Za-z0-9._-]` becomes `_`.
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl Default for CartKey {
    fn default() -> Self {
        Self(Self::NO_SITE.to_string())
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CartKey({})", self.0)
    }
}

impl From<&str> for CartKey {
    fn from(key: &str) -> Self {
        Self::from_optional(Some(key))
    }
}

impl From<String> for CartKey {
    fn from(key: String) -> Self {
        if key.is_empty() {
            Self::default()
        } else {
            Self(key)
        }
    }
}
