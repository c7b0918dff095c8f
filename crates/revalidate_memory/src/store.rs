// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The in-process store implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use revalidate_store::{AcquirePolicy, CachedEntry, Error, Lock, Store, Ttl};
use tick::Clock;

use crate::builder::InMemoryStoreBuilder;
use crate::lock::{InMemoryLockGuard, LockTable};

struct Slot<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Slot<V> {
    fn ttl(&self, now: Instant) -> Ttl {
        match self.expires_at {
            None => Ttl::Persistent,
            Some(at) if at <= now => Ttl::Missing,
            Some(at) => Ttl::Expires(at.duration_since(now)),
        }
    }
}

/// A store and lock backend that keeps everything in process memory.
///
/// Expiry is measured against the [`Clock`] passed at construction. Expired
/// values are dropped lazily when their key is next touched.
///
/// # Examples
///
/// ```
/// use revalidate_memory::InMemoryStore;
/// use revalidate_store::{AcquirePolicy, Lock, LockGuard};
/// use std::time::Duration;
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let store = InMemoryStore::<String>::new(Clock::new_frozen());
///
/// let guard = store
///     .try_acquire("Lock:report", Duration::from_secs(300), AcquirePolicy::NonBlocking)
///     .await?
///     .expect("lock is free");
/// assert!(store.is_locked("Lock:report"));
///
/// guard.release().await?;
/// assert!(!store.is_locked("Lock:report"));
/// # Ok::<(), revalidate_store::Error>(())
/// # });
/// ```
pub struct InMemoryStore<V> {
    clock: Clock,
    values: Arc<Mutex<HashMap<String, Slot<V>>>>,
    locks: Arc<LockTable>,
    retry_interval: Duration,
}

impl<V> std::fmt::Debug for InMemoryStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("entries", &self.values.lock().len())
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

impl<V> Clone for InMemoryStore<V> {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            values: Arc::clone(&self.values),
            locks: Arc::clone(&self.locks),
            retry_interval: self.retry_interval,
        }
    }
}

impl<V> InMemoryStore<V> {
    /// Creates an empty store with default settings.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self::builder(clock).build()
    }

    /// Creates a builder for configuring a store.
    ///
    /// # Examples
    ///
    /// ```
    /// use revalidate_memory::InMemoryStore;
    /// use std::time::Duration;
    /// use tick::Clock;
    ///
    /// let store = InMemoryStore::<u64>::builder(Clock::new_frozen())
    ///     .lock_retry_interval(Duration::from_millis(10))
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder(clock: Clock) -> InMemoryStoreBuilder<V> {
        InMemoryStoreBuilder::new(clock)
    }

    pub(crate) fn from_builder(builder: InMemoryStoreBuilder<V>) -> Self {
        Self {
            locks: Arc::new(LockTable::new(builder.clock.clone())),
            clock: builder.clock,
            values: Arc::new(Mutex::new(HashMap::new())),
            retry_interval: builder.lock_retry_interval,
        }
    }

    /// Stores `value` under `key` with no expiry.
    pub fn insert_persistent(&self, key: impl Into<String>, value: V) {
        self.values.lock().insert(
            key.into(),
            Slot {
                value,
                expires_at: None,
            },
        );
    }

    /// Removes `key`, returning `true` if a live value was present.
    pub fn remove(&self, key: &str) -> bool {
        let now = self.clock.instant();
        self.values
            .lock()
            .remove(key)
            .is_some_and(|slot| slot.ttl(now) != Ttl::Missing)
    }

    /// Returns the number of values that have not expired.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.instant();
        let mut values = self.values.lock();
        values.retain(|_, slot| slot.ttl(now) != Ttl::Missing);
        values.len()
    }

    /// Returns `true` if the store holds no live values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the lock named `lock_key` is currently held.
    #[must_use]
    pub fn is_locked(&self, lock_key: &str) -> bool {
        self.locks.is_held(lock_key)
    }
}

impl<V> InMemoryStore<V>
where
    V: Clone,
{
    fn read(&self, key: &str) -> Option<CachedEntry<V>> {
        let now = self.clock.instant();
        let mut values = self.values.lock();

        let ttl = values.get(key)?.ttl(now);
        if ttl == Ttl::Missing {
            values.remove(key);
            return None;
        }

        values.get(key).map(|slot| CachedEntry::new(slot.value.clone(), ttl))
    }
}

impl<V> Store<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>, Error> {
        Ok(self.read(key).map(CachedEntry::into_value))
    }

    async fn set(&self, key: &str, value: V, timeout: Duration) -> Result<(), Error> {
        let mut values = self.values.lock();
        if timeout.is_zero() {
            values.remove(key);
            return Ok(());
        }

        let expires_at = self.clock.instant().checked_add(timeout);
        values.insert(key.to_string(), Slot { value, expires_at });
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
        Ok(self.read(key).map_or(Ttl::Missing, |entry| entry.ttl()))
    }

    async fn entry(&self, key: &str) -> Result<Option<CachedEntry<V>>, Error> {
        Ok(self.read(key))
    }
}

impl<V> Lock for InMemoryStore<V>
where
    V: Send + Sync + 'static,
{
    type Guard = InMemoryLockGuard;

    async fn try_acquire(
        &self,
        lock_key: &str,
        hold_timeout: Duration,
        policy: AcquirePolicy,
    ) -> Result<Option<Self::Guard>, Error> {
        let max_wait = policy.max_wait();
        let stopwatch = self.clock.stopwatch();

        loop {
            if let Some(token) = self.locks.try_take(lock_key, hold_timeout) {
                return Ok(Some(InMemoryLockGuard::new(
                    Arc::clone(&self.locks),
                    lock_key.to_string(),
                    token,
                )));
            }

            let waited = stopwatch.elapsed();
            if waited >= max_wait {
                return Ok(None);
            }

            self.clock.delay(self.retry_interval.min(max_wait - waited)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use tick::ClockControl;

    use super::*;

    #[test]
    fn slot_ttl_reports_remaining_lifetime() {
        let now = Instant::now();
        let slot = Slot {
            value: 1,
            expires_at: now.checked_add(Duration::from_secs(5)),
        };
        assert_eq!(slot.ttl(now), Ttl::Expires(Duration::from_secs(5)));
        assert_eq!(slot.ttl(now + Duration::from_secs(5)), Ttl::Missing);

        let persistent = Slot {
            value: 1,
            expires_at: None,
        };
        assert_eq!(persistent.ttl(now), Ttl::Persistent);
    }

    #[test]
    fn len_skips_expired_values() {
        futures::executor::block_on(async {
            let control = ClockControl::new();
            let store = InMemoryStore::<u32>::new(control.to_clock());

            store.set("short", 1, Duration::from_secs(1)).await.expect("set failed");
            store.set("long", 2, Duration::from_secs(100)).await.expect("set failed");
            assert_eq!(store.len(), 2);

            control.advance(Duration::from_secs(1));
            assert_eq!(store.len(), 1);
            assert!(!store.is_empty());
        });
    }

    #[test]
    fn remove_reports_live_values_only() {
        futures::executor::block_on(async {
            let control = ClockControl::new();
            let store = InMemoryStore::<u32>::new(control.to_clock());

            store.set("a", 1, Duration::from_secs(1)).await.expect("set failed");
            store.set("b", 2, Duration::from_secs(1)).await.expect("set failed");
            assert!(store.remove("a"));

            control.advance(Duration::from_secs(2));
            assert!(!store.remove("b"));
            assert!(store.is_empty());
        });
    }

    #[test]
    fn debug_reports_entry_count() {
        let store = InMemoryStore::<u32>::new(Clock::new_frozen());
        store.insert_persistent("k", 1);
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryStore"));
        assert!(debug.contains("entries: 1"));
    }
}
