// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The named lock trait used to coordinate recomputation.

use std::time::Duration;

use crate::Error;

/// How long [`Lock::try_acquire`] may wait for a lock held by someone else.
///
/// # Examples
///
/// ```
/// use revalidate_store::AcquirePolicy;
/// use std::time::Duration;
///
/// assert_eq!(AcquirePolicy::default(), AcquirePolicy::NonBlocking);
/// assert_eq!(AcquirePolicy::NonBlocking.max_wait(), Duration::ZERO);
/// assert_eq!(AcquirePolicy::Wait(Duration::from_secs(2)).max_wait(), Duration::from_secs(2));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AcquirePolicy {
    /// Make a single attempt and give up immediately if the lock is held.
    #[default]
    NonBlocking,
    /// Keep retrying until the lock is acquired or the duration elapses.
    Wait(Duration),
}

impl AcquirePolicy {
    /// Returns the longest time an acquisition may wait.
    #[must_use]
    pub fn max_wait(self) -> Duration {
        match self {
            Self::NonBlocking => Duration::ZERO,
            Self::Wait(max) => max,
        }
    }
}

/// Proof of holding a lock acquired through [`Lock::try_acquire`].
///
/// Call [`release`](LockGuard::release) on every exit path. Dropping a guard
/// without releasing it is backend specific: in-process locks are freed right
/// away, distributed locks stay held until their hold timeout expires.
pub trait LockGuard: Send {
    /// The key of the held lock.
    fn lock_key(&self) -> &str;

    /// Releases the lock.
    ///
    /// Fails if the lock expired and was taken over by another owner, or if the
    /// backend cannot be reached.
    fn release(self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// A named mutual-exclusion primitive with automatic expiry.
///
/// A held lock expires on its own after `hold_timeout`, so a crashed holder can
/// never starve other callers forever.
pub trait Lock: Send + Sync {
    /// The guard returned for a successful acquisition.
    type Guard: LockGuard;

    /// Attempts to acquire the lock named `lock_key`.
    ///
    /// Returns `Ok(None)` when the lock stays held by someone else for as long
    /// as `policy` allows waiting. Errors are reserved for backend failures.
    fn try_acquire(
        &self,
        lock_key: &str,
        hold_timeout: Duration,
        policy: AcquirePolicy,
    ) -> impl Future<Output = Result<Option<Self::Guard>, Error>> + Send;
}
