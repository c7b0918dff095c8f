// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock store and lock for testing.
//!
//! [`MockStore`] keeps values in memory, records every operation and supports
//! failure injection. It does not track time: remaining lifetimes are whatever
//! the test configured through [`MockStore::with_entry`] or [`MockStore::set_ttl`].

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;

use crate::{AcquirePolicy, Error, Lock, LockGuard, Store, Ttl};

/// Recorded store or lock operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp<V> {
    /// A value was read.
    Get(String),
    /// A value was written.
    Set {
        /// The key that was written.
        key: String,
        /// The value that was written.
        value: V,
        /// The lifetime the value was written with.
        timeout: Duration,
    },
    /// A remaining lifetime was queried.
    Ttl(String),
    /// A lock acquisition was attempted.
    Acquire {
        /// The lock key.
        lock_key: String,
        /// The requested hold timeout.
        hold_timeout: Duration,
    },
    /// A lock was released.
    Release(String),
}

type FailPredicate<V> = Box<dyn Fn(&StoreOp<V>) -> bool + Send + Sync>;

struct Slot<V> {
    value: V,
    ttl: Ttl,
}

/// A configurable mock backend implementing both [`Store`] and [`Lock`].
///
/// Clones share the same data, lock table and operation log.
///
/// # Examples
///
/// ```
/// use revalidate_store::{Store, Ttl};
/// use revalidate_store::testing::{MockStore, StoreOp};
/// use std::time::Duration;
///
/// # futures::executor::block_on(async {
/// let store = MockStore::<String>::new()
///     .with_entry("answer", "42".to_string(), Ttl::Expires(Duration::from_secs(5)));
///
/// assert_eq!(store.get("answer").await?, Some("42".to_string()));
/// assert_eq!(store.ttl("answer").await?, Ttl::Expires(Duration::from_secs(5)));
/// assert_eq!(
///     store.operations(),
///     vec![StoreOp::Get("answer".to_string()), StoreOp::Ttl("answer".to_string())]
/// );
/// # Ok::<(), revalidate_store::Error>(())
/// # });
/// ```
pub struct MockStore<V> {
    data: Arc<Mutex<HashMap<String, Slot<V>>>>,
    locks: Arc<Mutex<HashSet<String>>>,
    operations: Arc<Mutex<Vec<StoreOp<V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<V>>>>,
}

impl<V> std::fmt::Debug for MockStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("entries", &self.data.lock().len())
            .field("locks", &self.locks.lock().len())
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl<V> Clone for MockStore<V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            locks: Arc::clone(&self.locks),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<V> Default for MockStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MockStore<V> {
    /// Creates an empty mock store with no locks held.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            locks: Arc::new(Mutex::new(HashSet::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Pre-populates `key` with `value` and the given remaining lifetime.
    #[must_use]
    pub fn with_entry(self, key: impl Into<String>, value: V, ttl: Ttl) -> Self {
        self.data.lock().insert(key.into(), Slot { value, ttl });
        self
    }

    /// Overrides the remaining lifetime reported for `key`.
    pub fn set_ttl(&self, key: &str, ttl: Ttl) {
        if let Some(slot) = self.data.lock().get_mut(key) {
            slot.ttl = ttl;
        }
    }

    /// Removes `key`, as if it had expired.
    pub fn expire(&self, key: &str) {
        self.data.lock().remove(key);
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Marks `lock_key` as held by another owner.
    pub fn hold_lock(&self, lock_key: impl Into<String>) {
        self.locks.lock().insert(lock_key.into());
    }

    /// Frees `lock_key` regardless of who holds it.
    pub fn free_lock(&self, lock_key: &str) {
        self.locks.lock().remove(lock_key);
    }

    /// Returns `true` if `lock_key` is currently held.
    #[must_use]
    pub fn is_locked(&self, lock_key: &str) -> bool {
        self.locks.lock().contains(lock_key)
    }

    /// Sets a predicate deciding which operations fail.
    ///
    /// Failed operations are still recorded.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp<V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    fn should_fail(&self, op: &StoreOp<V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<V: Clone> MockStore<V> {
    /// Returns the value stored under `key` without recording an operation.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<V> {
        self.data.lock().get(key).map(|slot| slot.value.clone())
    }

    /// Returns a copy of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp<V>> {
        self.operations.lock().clone()
    }

    /// Returns the recorded writes as `(key, value, timeout)` tuples.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, V, Duration)> {
        self.operations
            .lock()
            .iter()
            .filter_map(|op| match op {
                StoreOp::Set { key, value, timeout } => Some((key.clone(), value.clone(), *timeout)),
                _ => None,
            })
            .collect()
    }

    /// Clears the operation log.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Records `op`, failing it if the predicate says so.
    fn record(&self, op: StoreOp<V>) -> Result<(), Error> {
        let fail = self.should_fail(&op);
        self.operations.lock().push(op);
        if fail {
            return Err(Error::from_message("mock: injected failure"));
        }
        Ok(())
    }
}

impl<V> Store<V> for MockStore<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<V>, Error> {
        self.record(StoreOp::Get(key.to_string()))?;
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: V, timeout: Duration) -> Result<(), Error> {
        self.record(StoreOp::Set {
            key: key.to_string(),
            value: value.clone(),
            timeout,
        })?;
        self.data.lock().insert(
            key.to_string(),
            Slot {
                value,
                ttl: Ttl::Expires(timeout),
            },
        );
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
        self.record(StoreOp::Ttl(key.to_string()))?;
        Ok(self.data.lock().get(key).map_or(Ttl::Missing, |slot| slot.ttl))
    }
}

/// Guard returned by [`MockStore`]'s [`Lock`] implementation.
///
/// Dropping the guard frees the lock without recording a release.
pub struct MockLockGuard<V> {
    lock_key: String,
    store: MockStore<V>,
    released: bool,
}

impl<V> std::fmt::Debug for MockLockGuard<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLockGuard")
            .field("lock_key", &self.lock_key)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl<V> LockGuard for MockLockGuard<V>
where
    V: Clone + Send + Sync,
{
    fn lock_key(&self) -> &str {
        &self.lock_key
    }

    async fn release(mut self) -> Result<(), Error> {
        self.released = true;
        self.store.record(StoreOp::Release(self.lock_key.clone()))?;
        self.store.free_lock(&self.lock_key);
        Ok(())
    }
}

impl<V> Drop for MockLockGuard<V> {
    fn drop(&mut self) {
        if !self.released {
            self.store.free_lock(&self.lock_key);
        }
    }
}

impl<V> Lock for MockStore<V>
where
    V: Clone + Send + Sync,
{
    type Guard = MockLockGuard<V>;

    /// Acquires immediately or not at all; the mock never waits, whatever the policy.
    async fn try_acquire(
        &self,
        lock_key: &str,
        hold_timeout: Duration,
        _policy: AcquirePolicy,
    ) -> Result<Option<Self::Guard>, Error> {
        self.record(StoreOp::Acquire {
            lock_key: lock_key.to_string(),
            hold_timeout,
        })?;

        if !self.locks.lock().insert(lock_key.to_string()) {
            return Ok(None);
        }

        Ok(Some(MockLockGuard {
            lock_key: lock_key.to_string(),
            store: self.clone(),
            released: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn set_records_write_and_resets_ttl() {
        block_on(async {
            let store = MockStore::<i32>::new().with_entry("k", 1, Ttl::Expires(Duration::from_secs(1)));
            store.set("k", 2, Duration::from_secs(60)).await.unwrap();

            assert_eq!(store.peek("k"), Some(2));
            assert_eq!(store.ttl("k").await.unwrap(), Ttl::Expires(Duration::from_secs(60)));
            assert_eq!(store.writes(), vec![("k".to_string(), 2, Duration::from_secs(60))]);
        });
    }

    #[test]
    fn ttl_of_missing_key() {
        block_on(async {
            let store = MockStore::<i32>::new();
            assert_eq!(store.ttl("absent").await.unwrap(), Ttl::Missing);
        });
    }

    #[test]
    fn lock_is_exclusive_until_released() {
        block_on(async {
            let store = MockStore::<i32>::new();
            let hold = Duration::from_secs(300);

            let guard = store
                .try_acquire("Lock:k", hold, AcquirePolicy::NonBlocking)
                .await
                .unwrap()
                .expect("lock should be free");
            assert!(store.try_acquire("Lock:k", hold, AcquirePolicy::NonBlocking).await.unwrap().is_none());

            guard.release().await.unwrap();
            assert!(!store.is_locked("Lock:k"));
            assert!(store.try_acquire("Lock:k", hold, AcquirePolicy::NonBlocking).await.unwrap().is_some());
        });
    }

    #[test]
    fn dropped_guard_frees_lock() {
        block_on(async {
            let store = MockStore::<i32>::new();
            let guard = store
                .try_acquire("Lock:k", Duration::from_secs(1), AcquirePolicy::NonBlocking)
                .await
                .unwrap();
            assert!(store.is_locked("Lock:k"));
            drop(guard);
            assert!(!store.is_locked("Lock:k"));
        });
    }

    #[test]
    fn injected_failure_is_recorded() {
        block_on(async {
            let store = MockStore::<i32>::new();
            store.fail_when(|op| matches!(op, StoreOp::Get(_)));

            assert!(store.get("k").await.is_err());
            assert_eq!(store.operations(), vec![StoreOp::Get("k".to_string())]);

            store.clear_failures();
            assert!(store.get("k").await.is_ok());
        });
    }

    #[test]
    fn failed_release_keeps_lock_held() {
        block_on(async {
            let store = MockStore::<i32>::new();
            store.fail_when(|op| matches!(op, StoreOp::Release(_)));

            let guard = store
                .try_acquire("Lock:k", Duration::from_secs(1), AcquirePolicy::NonBlocking)
                .await
                .unwrap()
                .unwrap();
            assert!(guard.release().await.is_err());
            assert!(store.is_locked("Lock:k"));
        });
    }
}
