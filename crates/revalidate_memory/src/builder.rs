// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory stores.

use std::marker::PhantomData;
use std::time::Duration;

use tick::Clock;

use crate::store::InMemoryStore;

/// How often a waiting lock acquisition re-checks a held lock.
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Builder for an [`InMemoryStore`].
///
/// # Examples
///
/// ```
/// use revalidate_memory::InMemoryStoreBuilder;
/// use std::time::Duration;
/// use tick::Clock;
///
/// let store = InMemoryStoreBuilder::<String>::new(Clock::new_frozen())
///     .lock_retry_interval(Duration::from_millis(5))
///     .build();
/// assert!(store.is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder<V> {
    pub(crate) clock: Clock,
    pub(crate) lock_retry_interval: Duration,
    _phantom: PhantomData<fn() -> V>,
}

impl<V> InMemoryStoreBuilder<V> {
    /// Creates a builder measuring expiry against `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            lock_retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
            _phantom: PhantomData,
        }
    }

    /// Sets how often a waiting acquisition polls a held lock.
    ///
    /// Only matters for [`AcquirePolicy::Wait`](revalidate_store::AcquirePolicy::Wait).
    /// Defaults to [`DEFAULT_LOCK_RETRY_INTERVAL`]. A zero interval is raised to one millisecond.
    #[must_use]
    pub fn lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Builds the configured store.
    #[must_use]
    pub fn build(self) -> InMemoryStore<V> {
        InMemoryStore::from_builder(self)
    }
}
