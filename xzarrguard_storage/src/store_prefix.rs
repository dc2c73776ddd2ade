use derive_more::{Display, From};
use thiserror::Error;

use super::{StoreKey, StoreKeyError};

/// A store prefix.
///
/// A prefix is either empty (the store root) or a `/` terminated path relative to the store root.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StorePrefix(String);

/// An invalid store prefix.
#[derive(Debug, Clone, From, Error)]
#[error("invalid store prefix {0}")]
pub struct StorePrefixError(String);

/// A list of [`StorePrefix`].
pub type StorePrefixes = Vec<StorePrefix>;

impl StorePrefix {
    /// Create a new store prefix from `prefix`.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] if `prefix` is not valid according to [`StorePrefix::validate()`].
    pub fn new(prefix: impl Into<String>) -> Result<Self, StorePrefixError> {
        let prefix = prefix.into();
        if Self::validate(&prefix) {
            Ok(Self(prefix))
        } else {
            Err(StorePrefixError(prefix))
        }
    }

    pub(crate) fn new_validated(prefix: String) -> Self {
        debug_assert!(Self::validate(&prefix));
        Self(prefix)
    }

    /// The root prefix.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Returns true if this is the root prefix.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Extracts a string slice of the underlying prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a prefix.
    ///
    /// A prefix is either empty, or ends with `/` and does not start with `/`.
    #[must_use]
    pub fn validate(prefix: &str) -> bool {
        prefix.is_empty() || (prefix.ends_with('/') && !prefix.starts_with('/'))
    }

    /// Returns the key of `name` under this prefix.
    ///
    /// # Errors
    /// Returns a [`StoreKeyError`] if the joined key is not valid.
    pub fn key(&self, name: &str) -> Result<StoreKey, StoreKeyError> {
        StoreKey::new(self.0.clone() + name)
    }

    /// Returns the child prefix `name` under this prefix.
    ///
    /// # Errors
    /// Returns a [`StorePrefixError`] if the joined prefix is not valid.
    pub fn child(&self, name: &str) -> Result<Self, StorePrefixError> {
        let name = name.trim_end_matches('/');
        Self::new(self.0.clone() + name + "/")
    }

    /// Returns the parent of this prefix, or [`None`] for the root prefix.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.strip_suffix('/')?;
        Some(match trimmed.rfind('/') {
            Some(index) => Self(trimmed[..=index].to_string()),
            None => Self::root(),
        })
    }

    /// Returns true if this prefix is `other` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.0.starts_with(other.as_str())
    }
}

impl TryFrom<&str> for StorePrefix {
    type Error = StorePrefixError;

    fn try_from(prefix: &str) -> Result<Self, Self::Error> {
        Self::new(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_prefix() {
        assert!(StorePrefix::new("").is_ok());
        assert!(StorePrefix::new("a/").is_ok());
        assert!(StorePrefix::new("a").is_err());
        assert!(StorePrefix::new("/a/").is_err());
        assert_eq!(
            StorePrefix::new("a").unwrap_err().to_string(),
            "invalid store prefix a"
        );
        assert_eq!(StorePrefix::new("a/b/").unwrap().to_string(), "a/b/");
        assert!(StorePrefix::root().is_root());
    }

    #[test]
    fn store_prefix_navigation() {
        let prefix = StorePrefix::new("a/b/").unwrap();
        assert_eq!(prefix.key("zarr.json").unwrap().as_str(), "a/b/zarr.json");
        assert_eq!(prefix.child("c").unwrap().as_str(), "a/b/c/");
        assert_eq!(prefix.parent(), Some(StorePrefix::new("a/").unwrap()));
        assert_eq!(
            StorePrefix::new("a/").unwrap().parent(),
            Some(StorePrefix::root())
        );
        assert_eq!(StorePrefix::root().parent(), None);
        assert!(prefix.starts_with(&StorePrefix::new("a/").unwrap()));
        assert!(prefix.starts_with(&StorePrefix::root()));
        assert!(StorePrefix::root().key("").is_err());
    }
}
