//! Error types for [`IdMap`](crate::idmap::IdMap) operations.
//!
//! "Not found" is not an error: `get` and `pop` report absence through
//! `Option`. The only failure modes are a failed slot allocation and an
//! `add` on a key that is already populated.

use std::error::Error;
use std::fmt;

/// A branch array or node allocation failed.
///
/// Point operations and the non-destructive `*_make` set operations return
/// this error and leave every map they touched in a valid state.
///
/// # Examples
///
/// ```rust
/// use id_trie::AllocationError;
///
/// assert_eq!(format!("{}", AllocationError), "failed to allocate trie node slots");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AllocationError;

impl fmt::Display for AllocationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("failed to allocate trie node slots")
    }
}

impl Error for AllocationError {}

/// Errors reported by insertion into an [`IdMap`](crate::idmap::IdMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdMapError {
    /// A branch array could not be allocated.
    Allocation,
    /// `add` found a value already stored at the requested id.
    KeyExists,
}

impl fmt::Display for IdMapError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation => write!(formatter, "{AllocationError}"),
            Self::KeyExists => formatter.write_str("a value is already stored at this id"),
        }
    }
}

impl Error for IdMapError {}

impl From<AllocationError> for IdMapError {
    fn from(_: AllocationError) -> Self {
        Self::Allocation
    }
}

/// A rejected insertion.
///
/// Ownership of the value that could not be stored is handed back to the
/// caller, who decides whether to retry or release it.
///
/// # Examples
///
/// ```rust
/// use id_trie::{IdMap, IdMapError};
///
/// let mut map = IdMap::new();
/// map.add(7, "first").unwrap();
///
/// let rejected = map.add(7, "second").unwrap_err();
/// assert_eq!(rejected.error(), IdMapError::KeyExists);
/// assert_eq!(rejected.into_value(), "second");
/// assert_eq!(map.get(7), Some(&"first"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct InsertError<V> {
    error: IdMapError,
    value: V,
}

impl<V> InsertError<V> {
    pub(crate) const fn new(error: IdMapError, value: V) -> Self {
        Self { error, value }
    }

    /// Returns the reason the insertion was rejected.
    #[inline]
    pub const fn error(&self) -> IdMapError {
        self.error
    }

    /// Returns a reference to the value that was not stored.
    #[inline]
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the error, returning the value that was not stored.
    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }
}

impl<V> fmt::Debug for InsertError<V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InsertError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<V> fmt::Display for InsertError<V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.error)
    }
}

impl<V> Error for InsertError<V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(IdMapError::Allocation, "failed to allocate trie node slots")]
    #[case(IdMapError::KeyExists, "a value is already stored at this id")]
    fn test_id_map_error_display(#[case] error: IdMapError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn test_allocation_error_converts() {
        assert_eq!(IdMapError::from(AllocationError), IdMapError::Allocation);
    }

    #[rstest]
    fn test_insert_error_hands_value_back() {
        let error = InsertError::new(IdMapError::KeyExists, String::from("payload"));
        assert_eq!(error.error(), IdMapError::KeyExists);
        assert_eq!(error.value(), "payload");
        assert_eq!(error.to_string(), "a value is already stored at this id");
        assert_eq!(error.into_value(), "payload");
    }
}
