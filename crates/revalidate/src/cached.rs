// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cached function wrapper.

use std::time::Duration;

use revalidate_store::{CachedEntry, Lock, Store};
use tick::Clock;

use crate::{
    Error,
    freshness::FreshnessWindow,
    key::{CacheKey, KeyFormat, SignatureArgs},
    refresh::{Outcome, RefreshSettings, Refresher},
    telemetry::{Activity, Telemetry, ext::TelemetryExt},
};

/// An async function whose results are cached with stale-while-revalidate semantics.
///
/// Each call derives a key from the function name and the call arguments, then:
///
/// 1. serves the stored value if it is still fresh;
/// 2. otherwise tries to take the key's lock, and on success runs the function,
///    stores the result and returns it;
/// 3. otherwise serves the previously stored value, however stale, or fails with
///    [`Error::ColdCache`] if there is none.
///
/// At most one caller per key runs the function at a time, across every process
/// sharing the lock backend.
///
/// Created with [`cached_function`](crate::cached_function).
pub struct CachedFunction<F, S, L> {
    pub(crate) name: String,
    pub(crate) function: F,
    pub(crate) store: S,
    pub(crate) lock: L,
    pub(crate) prefix: String,
    pub(crate) key_format: KeyFormat,
    pub(crate) window: FreshnessWindow,
    pub(crate) settings: RefreshSettings,
    pub(crate) clock: Option<Clock>,
    pub(crate) telemetry: Option<Telemetry>,
}

impl<F, S, L> std::fmt::Debug for CachedFunction<F, S, L>
where
    S: std::fmt::Debug,
    L: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFunction")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("key_format", &self.key_format)
            .field("window", &self.window)
            .field("hold_timeout", &self.settings.hold_timeout)
            .field("store", &self.store)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl<F, S, L> CachedFunction<F, S, L> {
    /// The name identifying the computation in keys and telemetry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The key derivation format.
    #[must_use]
    pub fn key_format(&self) -> KeyFormat {
        self.key_format
    }

    /// The freshness rule applied to stored values.
    #[must_use]
    pub fn window(&self) -> FreshnessWindow {
        self.window
    }

    /// How long a recomputation lock may be held.
    #[must_use]
    pub fn hold_timeout(&self) -> Duration {
        self.settings.hold_timeout
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the keys a call with `args` reads and locks, without touching the store.
    #[must_use]
    pub fn key_for<A>(&self, args: &A) -> CacheKey
    where
        A: SignatureArgs + ?Sized,
    {
        self.key_format.cache_key(&self.prefix, &self.name, &args.signature())
    }

    /// Calls the function through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColdCache`] when nothing is stored and another caller is
    /// recomputing, [`Error::Computation`] with the function's own error, or
    /// [`Error::Store`] when the backend fails.
    pub async fn call<A, V, E, Fut>(&self, args: A) -> Result<V, Error<E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        A: SignatureArgs,
        S: Store<V>,
        L: Lock,
        V: Clone + Send,
    {
        let key = self.key_for(&args);
        match self.serve(&key, args).await?.into_value() {
            Some(value) => Ok(value),
            None => Err(Error::ColdCache { key: key.key().to_string() }),
        }
    }

    /// Calls the function through the cache and reports how the call was served.
    ///
    /// A cold cache is reported as [`Outcome::Cold`] rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Computation`] with the function's own error, or
    /// [`Error::Store`] when the backend fails.
    pub async fn call_with_outcome<A, V, E, Fut>(&self, args: A) -> Result<Outcome<V>, Error<E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        A: SignatureArgs,
        S: Store<V>,
        L: Lock,
        V: Clone + Send,
    {
        let key = self.key_for(&args);
        self.serve(&key, args).await
    }

    async fn serve<A, V, E, Fut>(&self, key: &CacheKey, args: A) -> Result<Outcome<V>, Error<E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        S: Store<V>,
        L: Lock,
        V: Clone + Send,
    {
        let entry = match self.store.entry(key.key()).await {
            Ok(entry) => entry,
            Err(error) => {
                self.telemetry.record(&self.name, key.key(), Activity::StoreFailed, None);
                return Err(Error::Store(error));
            }
        };

        let cached = match entry {
            Some(entry) if self.window.admits(entry.ttl()) => {
                self.telemetry.record(&self.name, key.key(), Activity::Fresh, None);
                return Ok(Outcome::Fresh(entry.into_value()));
            }
            entry => entry.map(CachedEntry::into_value),
        };

        self.refresher()
            .refresh_or_serve_stale(key, cached, || (self.function)(args))
            .await
    }

    fn refresher(&self) -> Refresher<'_, S, L> {
        Refresher {
            store: &self.store,
            lock: &self.lock,
            settings: self.settings,
            clock: self.clock.as_ref(),
            telemetry: &self.telemetry,
            name: &self.name,
        }
    }
}
