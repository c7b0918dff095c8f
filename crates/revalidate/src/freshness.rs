// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deciding whether a cached value can be served without recomputation.

use std::time::Duration;

use revalidate_store::{CachedEntry, Ttl};

/// The freshness rule for values written with a fixed lifetime.
///
/// Values are stored with a lifetime of `timeout`. A value stays fresh for the first
/// `freshness_timeout` of that lifetime, that is while its remaining lifetime is
/// strictly greater than `timeout - freshness_timeout`. After that it is stale but
/// still servable until the store expires it.
///
/// # Examples
///
/// ```
/// use revalidate::FreshnessWindow;
/// use revalidate_store::Ttl;
/// use std::time::Duration;
///
/// let window = FreshnessWindow::new(Duration::from_secs(60), Duration::from_secs(50));
/// assert_eq!(window.cutoff(), Duration::from_secs(10));
///
/// assert!(window.admits(Ttl::Expires(Duration::from_secs(59))));
/// assert!(!window.admits(Ttl::Expires(Duration::from_secs(10))));
/// assert!(!window.admits(Ttl::Missing));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FreshnessWindow {
    timeout: Duration,
    freshness_timeout: Duration,
}

impl FreshnessWindow {
    /// Creates a window for values stored with lifetime `timeout`.
    ///
    /// A `freshness_timeout` at or above `timeout` leaves a zero cutoff: values stay
    /// fresh for their whole lifetime and are recomputed only once they expire.
    #[must_use]
    pub fn new(timeout: Duration, freshness_timeout: Duration) -> Self {
        Self {
            timeout,
            freshness_timeout,
        }
    }

    /// The lifetime values are written with.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// How long after a write a value counts as fresh.
    #[must_use]
    pub fn freshness_timeout(&self) -> Duration {
        self.freshness_timeout
    }

    /// Remaining lifetime at or below which a value is stale.
    #[must_use]
    pub fn cutoff(&self) -> Duration {
        self.timeout.saturating_sub(self.freshness_timeout)
    }

    /// Returns `true` if a value with remaining lifetime `ttl` is fresh.
    ///
    /// Values without expiry are always fresh.
    #[must_use]
    pub fn admits(&self, ttl: Ttl) -> bool {
        ttl.exceeds(self.cutoff())
    }

    /// Returns `true` if `entry` holds a value that can be served as is.
    #[must_use]
    pub fn is_fresh<V>(&self, entry: Option<&CachedEntry<V>>) -> bool {
        entry.is_some_and(|entry| self.admits(entry.ttl()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> FreshnessWindow {
        FreshnessWindow::new(Duration::from_secs(60), Duration::from_secs(50))
    }

    #[test]
    fn boundary_is_stale() {
        assert!(!window().admits(Ttl::Expires(Duration::from_secs(10))));
        assert!(window().admits(Ttl::Expires(Duration::from_millis(10_001))));
    }

    #[test]
    fn absent_entry_is_not_fresh() {
        assert!(!window().is_fresh::<u32>(None));
    }

    #[test]
    fn entry_freshness_follows_ttl() {
        let fresh = CachedEntry::new(1, Ttl::Expires(Duration::from_secs(59)));
        let stale = CachedEntry::new(1, Ttl::Expires(Duration::from_secs(5)));
        assert!(window().is_fresh(Some(&fresh)));
        assert!(!window().is_fresh(Some(&stale)));
    }

    #[test]
    fn persistent_entry_is_fresh() {
        let entry = CachedEntry::new("v", Ttl::Persistent);
        assert!(window().is_fresh(Some(&entry)));
    }

    #[test]
    fn oversized_freshness_saturates_cutoff() {
        let window = FreshnessWindow::new(Duration::from_secs(10), Duration::from_secs(30));
        assert_eq!(window.cutoff(), Duration::ZERO);
        assert!(window.admits(Ttl::Expires(Duration::from_nanos(1))));
        assert!(!window.admits(Ttl::Expires(Duration::ZERO)));
        assert!(!window.admits(Ttl::Missing));
    }

    #[test]
    fn accessors() {
        let window = window();
        assert_eq!(window.timeout(), Duration::from_secs(60));
        assert_eq!(window.freshness_timeout(), Duration::from_secs(50));
    }
}
