// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{ops::Deref, time::Duration};

/// Remaining lifetime of a key as reported by a [`Store`](crate::Store).
///
/// # Examples
///
/// ```
/// use revalidate_store::Ttl;
/// use std::time::Duration;
///
/// let threshold = Duration::from_secs(10);
///
/// assert!(Ttl::Expires(Duration::from_secs(30)).exceeds(threshold));
/// assert!(!Ttl::Expires(Duration::from_secs(5)).exceeds(threshold));
/// assert!(Ttl::Persistent.exceeds(threshold));
/// assert!(!Ttl::Missing.exceeds(threshold));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// The key exists and expires after the given duration.
    Expires(Duration),
    /// The key exists and has no expiry.
    Persistent,
    /// The key does not exist, or has already expired.
    Missing,
}

impl Ttl {
    /// Returns the remaining lifetime, if the key has one.
    ///
    /// Missing keys report [`Duration::ZERO`]; persistent keys report `None`.
    #[must_use]
    pub fn remaining(self) -> Option<Duration> {
        match self {
            Self::Expires(remaining) => Some(remaining),
            Self::Missing => Some(Duration::ZERO),
            Self::Persistent => None,
        }
    }

    /// Returns `true` if the remaining lifetime is strictly greater than `threshold`.
    ///
    /// A persistent key exceeds every threshold; a missing key exceeds none.
    #[must_use]
    pub fn exceeds(self, threshold: Duration) -> bool {
        match self {
            Self::Expires(remaining) => remaining > threshold,
            Self::Persistent => true,
            Self::Missing => false,
        }
    }

    /// Builds a `Ttl` from a millisecond reply using the Redis `PTTL` conventions.
    ///
    /// `-2` means the key is missing and `-1` means it has no expiry.
    #[must_use]
    pub fn from_pttl_millis(millis: i64) -> Self {
        match millis {
            -1 => Self::Persistent,
            m if m < 0 => Self::Missing,
            m => Self::Expires(Duration::from_millis(m.unsigned_abs())),
        }
    }
}

/// A value read from a [`Store`](crate::Store) together with its remaining lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedEntry<V> {
    value: V,
    ttl: Ttl,
}

impl<V> CachedEntry<V> {
    /// Creates an entry from a value and its remaining lifetime.
    pub fn new(value: V, ttl: Ttl) -> Self {
        Self { value, ttl }
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns the remaining lifetime observed when the entry was read.
    #[must_use]
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }
}

impl<V> Deref for CachedEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pttl_conventions() {
        assert_eq!(Ttl::from_pttl_millis(-2), Ttl::Missing);
        assert_eq!(Ttl::from_pttl_millis(-1), Ttl::Persistent);
        assert_eq!(Ttl::from_pttl_millis(0), Ttl::Expires(Duration::ZERO));
        assert_eq!(Ttl::from_pttl_millis(1500), Ttl::Expires(Duration::from_millis(1500)));
    }

    #[test]
    fn remaining_of_missing_key_is_zero() {
        assert_eq!(Ttl::Missing.remaining(), Some(Duration::ZERO));
        assert_eq!(Ttl::Persistent.remaining(), None);
    }

    #[test]
    fn exceeds_is_strict() {
        let ten = Duration::from_secs(10);
        assert!(!Ttl::Expires(ten).exceeds(ten));
        assert!(Ttl::Expires(ten + Duration::from_millis(1)).exceeds(ten));
        assert!(!Ttl::Missing.exceeds(Duration::ZERO));
    }

    #[test]
    fn entry_derefs_to_value() {
        let entry = CachedEntry::new("v1".to_string(), Ttl::Persistent);
        assert_eq!(entry.len(), 2);
        assert_eq!(entry.ttl(), Ttl::Persistent);
        assert_eq!(entry.into_value(), "v1");
    }
}
