// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Single-flight recomputation of stale or missing values.
//!
//! When a value is not fresh, callers race for the lock guarding its key. The winner
//! runs the computation, writes the result and releases the lock. Everyone else
//! serves the value they already read, however stale, or reports a cold cache when
//! there was nothing to serve.

use std::time::Duration;

use revalidate_store::{AcquirePolicy, Lock, LockGuard, Store};
use tick::Clock;

use crate::{
    Error,
    key::CacheKey,
    telemetry::{
        Activity, Telemetry,
        ext::{TelemetryExt, timed},
    },
};

/// How a cached function call was served.
///
/// # Examples
///
/// ```
/// use revalidate::Outcome;
///
/// let outcome = Outcome::Stale("yesterday's report");
/// assert!(outcome.is_served());
/// assert_eq!(outcome.into_value(), Some("yesterday's report"));
///
/// assert_eq!(Outcome::<u32>::Cold.into_value(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<V> {
    /// The cached value was fresh and returned without recomputation.
    Fresh(V),
    /// This call recomputed the value and wrote it to the store.
    Refreshed(V),
    /// Another caller holds the lock; the previously cached value was returned.
    Stale(V),
    /// Another caller holds the lock and there was no cached value to return.
    Cold,
}

impl<V> Outcome<V> {
    /// Returns the served value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        match self {
            Self::Fresh(value) | Self::Refreshed(value) | Self::Stale(value) => Some(value),
            Self::Cold => None,
        }
    }

    /// Converts into the served value, if any.
    #[must_use]
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Fresh(value) | Self::Refreshed(value) | Self::Stale(value) => Some(value),
            Self::Cold => None,
        }
    }

    /// Returns `true` unless the outcome is [`Outcome::Cold`].
    #[must_use]
    pub fn is_served(&self) -> bool {
        !matches!(self, Self::Cold)
    }

    pub(crate) fn activity(&self) -> Activity {
        match self {
            Self::Fresh(_) => Activity::Fresh,
            Self::Refreshed(_) => Activity::Refreshed,
            Self::Stale(_) => Activity::Stale,
            Self::Cold => Activity::Cold,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RefreshSettings {
    /// Lifetime of written values.
    pub timeout: Duration,
    /// How long a held lock lives before it expires on its own.
    pub hold_timeout: Duration,
    pub acquire: AcquirePolicy,
}

/// Borrowed view of a cached function used for one recomputation attempt.
pub(crate) struct Refresher<'a, S, L> {
    pub store: &'a S,
    pub lock: &'a L,
    pub settings: RefreshSettings,
    pub clock: Option<&'a Clock>,
    pub telemetry: &'a Option<Telemetry>,
    pub name: &'a str,
}

impl<S, L> Refresher<'_, S, L>
where
    L: Lock,
{
    /// Recomputes the value under `key` unless another caller already is.
    ///
    /// `cached` is the value read before deciding to refresh. It is returned as
    /// [`Outcome::Stale`] when the lock is unavailable. Computation errors are
    /// returned unchanged and nothing is written; the lock is released either way.
    pub(crate) async fn refresh_or_serve_stale<V, E, F, Fut>(
        &self,
        key: &CacheKey,
        cached: Option<V>,
        compute: F,
    ) -> Result<Outcome<V>, Error<E>>
    where
        S: Store<V>,
        V: Clone + Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let acquired = self
            .lock
            .try_acquire(key.lock_key(), self.settings.hold_timeout, self.settings.acquire)
            .await;

        let guard = match acquired {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                let outcome = cached.map_or(Outcome::Cold, Outcome::Stale);
                self.record(key, outcome.activity(), None);
                return Ok(outcome);
            }
            Err(error) => {
                self.record(key, Activity::StoreFailed, None);
                return Err(Error::Store(error));
            }
        };

        let timed = timed(self.clock, compute()).await;
        let value = match timed.result {
            Ok(value) => value,
            Err(error) => {
                self.record(key, Activity::ComputeFailed, timed.duration);
                self.release(key, guard).await;
                return Err(Error::Computation(error));
            }
        };

        let written = self.store.set(key.key(), value.clone(), self.settings.timeout).await;
        self.release(key, guard).await;

        if let Err(error) = written {
            self.record(key, Activity::StoreFailed, timed.duration);
            return Err(Error::Store(error));
        }

        self.record(key, Activity::Refreshed, timed.duration);
        Ok(Outcome::Refreshed(value))
    }

    /// Releases `guard`. A failed release is recorded but not returned: the lock
    /// expires through its hold timeout.
    async fn release(&self, key: &CacheKey, guard: L::Guard) {
        if guard.release().await.is_err() {
            self.record(key, Activity::ReleaseFailed, None);
        }
    }

    fn record(&self, key: &CacheKey, activity: Activity, duration: Option<Duration>) {
        self.telemetry.record(self.name, key.key(), activity, duration);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use revalidate_store::testing::{MockStore, StoreOp};

    use super::*;
    use crate::telemetry::config::TelemetryConfig;
    use crate::telemetry::testing::LogCapture;

    const TIMEOUT: Duration = Duration::from_secs(60);
    const HOLD: Duration = Duration::from_secs(300);

    fn settings() -> RefreshSettings {
        RefreshSettings {
            timeout: TIMEOUT,
            hold_timeout: HOLD,
            acquire: AcquirePolicy::NonBlocking,
        }
    }

    fn refresher<'a>(
        store: &'a MockStore<String>,
        telemetry: &'a Option<Telemetry>,
    ) -> Refresher<'a, MockStore<String>, MockStore<String>> {
        Refresher {
            store,
            lock: store,
            settings: settings(),
            clock: None,
            telemetry,
            name: "report",
        }
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn winner_computes_writes_and_releases() {
        block_on(async {
            let store = MockStore::new();
            let key = CacheKey::new(":report:1");

            let outcome = refresher(&store, &None)
                .refresh_or_serve_stale(&key, None, || async { Ok::<_, String>("v1".to_string()) })
                .await
                .expect("refresh failed");

            assert_eq!(outcome, Outcome::Refreshed("v1".to_string()));
            assert_eq!(
                store.operations(),
                vec![
                    StoreOp::Acquire {
                        lock_key: "Lock::report:1".to_string(),
                        hold_timeout: HOLD,
                    },
                    StoreOp::Set {
                        key: ":report:1".to_string(),
                        value: "v1".to_string(),
                        timeout: TIMEOUT,
                    },
                    StoreOp::Release("Lock::report:1".to_string()),
                ]
            );
            assert!(!store.is_locked("Lock::report:1"));
        });
    }

    #[test]
    fn lock_denied_serves_stale_value() {
        block_on(async {
            let store = MockStore::new();
            store.hold_lock("Lock::report:1");
            let calls = AtomicUsize::new(0);

            let outcome = refresher(&store, &None)
                .refresh_or_serve_stale(&CacheKey::new(":report:1"), Some("old".to_string()), || async {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Ok::<_, String>("new".to_string())
                })
                .await
                .expect("refresh failed");

            assert_eq!(outcome, Outcome::Stale("old".to_string()));
            assert_eq!(calls.load(Ordering::Relaxed), 0);
            assert!(store.writes().is_empty());
        });
    }

    #[test]
    fn lock_denied_without_value_is_cold() {
        block_on(async {
            let store = MockStore::new();
            store.hold_lock("Lock::report:1");

            let outcome = refresher(&store, &None)
                .refresh_or_serve_stale(&CacheKey::new(":report:1"), None, || async { Ok::<_, String>("new".to_string()) })
                .await
                .expect("refresh failed");

            assert_eq!(outcome, Outcome::Cold);
            assert!(store.is_locked("Lock::report:1"));
        });
    }

    #[test]
    fn computation_error_skips_write_and_releases() {
        block_on(async {
            let store = MockStore::new();

            let err = refresher(&store, &None)
                .refresh_or_serve_stale(&CacheKey::new(":report:1"), Some("old".to_string()), || async {
                    Err::<String, _>("upstream down".to_string())
                })
                .await
                .expect_err("computation error should propagate");

            assert_eq!(err.into_computation(), Some("upstream down".to_string()));
            assert!(store.writes().is_empty());
            assert!(!store.is_locked("Lock::report:1"));
            assert_eq!(store.peek(":report:1"), None);
        });
    }

    #[test]
    fn write_failure_propagates_after_release() {
        block_on(async {
            let store = MockStore::new();
            store.fail_when(|op| matches!(op, StoreOp::Set { .. }));

            let err = refresher(&store, &None)
                .refresh_or_serve_stale(&CacheKey::new(":report:1"), None, || async { Ok::<_, String>("v1".to_string()) })
                .await
                .expect_err("write failure should propagate");

            assert!(matches!(err, Error::Store(_)));
            assert!(!store.is_locked("Lock::report:1"));
            assert!(store.operations().contains(&StoreOp::Release("Lock::report:1".to_string())));
        });
    }

    #[test]
    fn acquire_failure_propagates() {
        block_on(async {
            let store = MockStore::new();
            store.fail_when(|op| matches!(op, StoreOp::Acquire { .. }));

            let err = refresher(&store, &None)
                .refresh_or_serve_stale(&CacheKey::new(":report:1"), Some("old".to_string()), || async {
                    Ok::<_, String>("v1".to_string())
                })
                .await
                .expect_err("acquire failure should propagate");

            assert!(matches!(err, Error::Store(_)));
        });
    }

    #[test]
    fn release_failure_still_returns_value() {
        block_on(async {
            let store = MockStore::new();
            store.fail_when(|op| matches!(op, StoreOp::Release(_)));
            let telemetry = TelemetryConfig::default().with_logs().build();

            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());

            let outcome = refresher(&store, &telemetry)
                .refresh_or_serve_stale(&CacheKey::new(":report:1"), None, || async { Ok::<_, String>("v1".to_string()) })
                .await
                .expect("release failure is not fatal");

            assert_eq!(outcome, Outcome::Refreshed("v1".to_string()));
            assert_eq!(store.peek(":report:1"), Some("v1".to_string()));
            capture.assert_contains("release_failed");
            capture.assert_contains("WARN");
        });
    }

    #[test]
    fn computation_is_timed_with_clock() {
        block_on(async {
            let store = MockStore::new();
            let control = tick::ClockControl::new();
            let clock = control.to_clock();
            let telemetry = TelemetryConfig::default().with_logs().build();

            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());

            let refresher = Refresher {
                clock: Some(&clock),
                ..refresher(&store, &telemetry)
            };
            refresher
                .refresh_or_serve_stale(&CacheKey::new(":report:1"), None, || async {
                    control.advance(Duration::from_millis(250));
                    Ok::<_, String>("v1".to_string())
                })
                .await
                .expect("refresh failed");

            capture.assert_contains("refreshed");
            capture.assert_contains("250000000");
        });
    }

    #[test]
    fn outcome_accessors() {
        assert_eq!(Outcome::Fresh(1).value(), Some(&1));
        assert_eq!(Outcome::Refreshed(2).into_value(), Some(2));
        assert!(!Outcome::<u8>::Cold.is_served());
        assert_eq!(Outcome::Stale(3).activity(), Activity::Stale);
        assert_eq!(Outcome::<u8>::Cold.activity(), Activity::Cold);
    }
}
