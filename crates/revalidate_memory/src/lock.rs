// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use revalidate_store::{Error, LockGuard};
use tick::Clock;

#[derive(Debug)]
struct Holder {
    token: u64,
    expires_at: Option<Instant>,
}

/// Named locks with expiry, shared by every clone of a store.
#[derive(Debug)]
pub(crate) struct LockTable {
    clock: Clock,
    holders: Mutex<HashMap<String, Holder>>,
    next_token: AtomicU64,
}

impl LockTable {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            holders: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Takes the lock if it is free or its previous holder expired.
    pub(crate) fn try_take(&self, lock_key: &str, hold_timeout: Duration) -> Option<u64> {
        let now = self.clock.instant();
        let mut holders = self.holders.lock();

        if holders.get(lock_key).is_some_and(|holder| !is_expired(holder, now)) {
            return None;
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        holders.insert(
            lock_key.to_string(),
            Holder {
                token,
                expires_at: now.checked_add(hold_timeout),
            },
        );
        Some(token)
    }

    /// Frees the lock if `token` still owns it. Returns `false` otherwise.
    pub(crate) fn release(&self, lock_key: &str, token: u64) -> bool {
        let now = self.clock.instant();
        let mut holders = self.holders.lock();

        match holders.get(lock_key) {
            Some(holder) if holder.token == token => {
                let owned = !is_expired(holder, now);
                holders.remove(lock_key);
                owned
            }
            _ => false,
        }
    }

    pub(crate) fn is_held(&self, lock_key: &str) -> bool {
        let now = self.clock.instant();
        self.holders.lock().get(lock_key).is_some_and(|holder| !is_expired(holder, now))
    }
}

fn is_expired(holder: &Holder, now: Instant) -> bool {
    holder.expires_at.is_some_and(|at| at <= now)
}

/// Guard for a lock acquired from an [`InMemoryStore`](crate::InMemoryStore).
///
/// The lock is freed by [`release`](LockGuard::release) or when the guard is dropped.
#[derive(Debug)]
pub struct InMemoryLockGuard {
    table: Arc<LockTable>,
    lock_key: String,
    token: u64,
    released: bool,
}

impl InMemoryLockGuard {
    pub(crate) fn new(table: Arc<LockTable>, lock_key: String, token: u64) -> Self {
        Self {
            table,
            lock_key,
            token,
            released: false,
        }
    }
}

impl LockGuard for InMemoryLockGuard {
    fn lock_key(&self) -> &str {
        &self.lock_key
    }

    async fn release(mut self) -> Result<(), Error> {
        self.released = true;
        if self.table.release(&self.lock_key, self.token) {
            Ok(())
        } else {
            Err(Error::lock_not_owned(self.lock_key.as_str()))
        }
    }
}

impl Drop for InMemoryLockGuard {
    fn drop(&mut self) {
        if !self.released {
            self.table.release(&self.lock_key, self.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use tick::ClockControl;

    use super::*;

    #[test]
    fn take_is_exclusive_until_expiry() {
        let control = ClockControl::new();
        let table = LockTable::new(control.to_clock());

        let first = table.try_take("Lock:a", Duration::from_secs(10));
        assert!(first.is_some());
        assert_eq!(table.try_take("Lock:a", Duration::from_secs(10)), None);

        control.advance(Duration::from_secs(10));
        let second = table.try_take("Lock:a", Duration::from_secs(10));
        assert!(second.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn release_requires_matching_token() {
        let control = ClockControl::new();
        let table = LockTable::new(control.to_clock());

        let token = table.try_take("Lock:a", Duration::from_secs(10)).expect("lock should be free");
        assert!(!table.release("Lock:a", token + 1));
        assert!(table.is_held("Lock:a"));
        assert!(table.release("Lock:a", token));
        assert!(!table.is_held("Lock:a"));
    }

    #[test]
    fn release_after_expiry_is_not_owned() {
        let control = ClockControl::new();
        let table = LockTable::new(control.to_clock());

        let token = table.try_take("Lock:a", Duration::from_secs(1)).expect("lock should be free");
        control.advance(Duration::from_secs(2));
        assert!(!table.release("Lock:a", token));
    }

    #[test]
    fn dropped_guard_frees_lock() {
        let control = ClockControl::new();
        let table = Arc::new(LockTable::new(control.to_clock()));

        let token = table.try_take("Lock:a", Duration::from_secs(10)).expect("lock should be free");
        let guard = InMemoryLockGuard::new(Arc::clone(&table), "Lock:a".to_string(), token);
        assert_eq!(guard.lock_key(), "Lock:a");
        drop(guard);

        assert!(!table.is_held("Lock:a"));
    }
}
