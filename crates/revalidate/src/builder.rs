// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for cached functions.

use std::time::Duration;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::MeterProvider;
use revalidate_store::{AcquirePolicy, Lock};
use tick::Clock;

use crate::{
    cached::CachedFunction,
    freshness::FreshnessWindow,
    key::KeyFormat,
    refresh::RefreshSettings,
    telemetry::config::TelemetryConfig,
};

/// How long a recomputation lock is held before it expires on its own.
pub const DEFAULT_HOLD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Starts building a cached function.
///
/// Values are stored for `timeout` and served without recomputation for the first
/// `freshness_timeout` of that lifetime. See [`CachedFunctionBuilder`] for the
/// remaining options.
///
/// # Examples
///
/// ```
/// use revalidate::cached_function;
/// use revalidate_memory::InMemoryStore;
/// use std::time::Duration;
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let clock = Clock::new_frozen();
/// let prices = cached_function(Duration::from_secs(60), Duration::from_secs(50))
///     .prefix("shop")
///     .backend(InMemoryStore::<u32>::new(clock))
///     .wrap("price", |(sku,): (u32,)| async move { Ok::<_, std::io::Error>(sku * 100) });
///
/// assert_eq!(prices.call((7,)).await?, 700);
/// assert_eq!(prices.key_for(&(7,)).key(), "shop:price:7");
/// # Ok::<(), revalidate::Error<std::io::Error>>(())
/// # });
/// ```
#[must_use]
pub fn cached_function(timeout: Duration, freshness_timeout: Duration) -> CachedFunctionBuilder {
    CachedFunctionBuilder::new(FreshnessWindow::new(timeout, freshness_timeout))
}

/// Builder for a [`CachedFunction`].
///
/// Created by [`cached_function`]. A store and a lock must be provided, either
/// separately with [`store`](Self::store) and [`lock`](Self::lock) or together with
/// [`backend`](Self::backend), before the computation is attached with
/// [`wrap`](Self::wrap).
#[derive(Debug)]
pub struct CachedFunctionBuilder<S = (), L = ()> {
    window: FreshnessWindow,
    prefix: String,
    key_format: KeyFormat,
    hold_timeout: Duration,
    acquire: AcquirePolicy,
    clock: Option<Clock>,
    telemetry: TelemetryConfig,
    store: S,
    lock: L,
}

impl CachedFunctionBuilder {
    fn new(window: FreshnessWindow) -> Self {
        Self {
            window,
            prefix: String::new(),
            key_format: KeyFormat::default(),
            hold_timeout: DEFAULT_HOLD_TIMEOUT,
            acquire: AcquirePolicy::default(),
            clock: None,
            telemetry: TelemetryConfig::default(),
            store: (),
            lock: (),
        }
    }

    /// Uses `backend` as both the store and the lock.
    ///
    /// The backend is cloned; clones of every bundled backend share their data.
    #[must_use]
    pub fn backend<B>(self, backend: B) -> CachedFunctionBuilder<B, B>
    where
        B: Clone,
    {
        CachedFunctionBuilder {
            window: self.window,
            prefix: self.prefix,
            key_format: self.key_format,
            hold_timeout: self.hold_timeout,
            acquire: self.acquire,
            clock: self.clock,
            telemetry: self.telemetry,
            lock: backend.clone(),
            store: backend,
        }
    }
}

impl<L> CachedFunctionBuilder<(), L> {
    /// Sets the store values are read from and written to.
    #[must_use]
    pub fn store<S>(self, store: S) -> CachedFunctionBuilder<S, L> {
        CachedFunctionBuilder {
            window: self.window,
            prefix: self.prefix,
            key_format: self.key_format,
            hold_timeout: self.hold_timeout,
            acquire: self.acquire,
            clock: self.clock,
            telemetry: self.telemetry,
            store,
            lock: self.lock,
        }
    }
}

impl<S> CachedFunctionBuilder<S, ()> {
    /// Sets the lock that serializes recomputation.
    #[must_use]
    pub fn lock<L>(self, lock: L) -> CachedFunctionBuilder<S, L>
    where
        L: Lock,
    {
        CachedFunctionBuilder {
            window: self.window,
            prefix: self.prefix,
            key_format: self.key_format,
            hold_timeout: self.hold_timeout,
            acquire: self.acquire,
            clock: self.clock,
            telemetry: self.telemetry,
            store: self.store,
            lock,
        }
    }
}

impl<S, L> CachedFunctionBuilder<S, L> {
    /// Sets the key prefix. Defaults to the empty string.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets how keys are derived from call arguments.
    #[must_use]
    pub fn key_format(mut self, key_format: KeyFormat) -> Self {
        self.key_format = key_format;
        self
    }

    /// Sets how long a recomputation lock may be held.
    ///
    /// Must exceed the worst-case duration of the computation, otherwise a second
    /// caller may start recomputing before the first one finishes. Defaults to
    /// [`DEFAULT_HOLD_TIMEOUT`].
    #[must_use]
    pub fn hold_timeout(mut self, hold_timeout: Duration) -> Self {
        self.hold_timeout = hold_timeout;
        self
    }

    /// Sets whether callers wait for a held lock. Defaults to
    /// [`AcquirePolicy::NonBlocking`].
    #[must_use]
    pub fn acquire_policy(mut self, policy: AcquirePolicy) -> Self {
        self.acquire = policy;
        self
    }

    /// Sets the clock used to time computations for telemetry.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enables structured logging of call outcomes.
    #[cfg(any(feature = "logs", test))]
    #[must_use]
    pub fn logs(mut self) -> Self {
        self.telemetry = self.telemetry.with_logs();
        self
    }

    /// Enables OpenTelemetry metrics using the provided meter provider.
    ///
    /// Calls are always counted. Computation durations are recorded only when a
    /// [`clock`](Self::clock) is configured.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.telemetry = self.telemetry.with_metrics(provider);
        self
    }
}

impl<S, L> CachedFunctionBuilder<S, L>
where
    L: Lock,
{
    /// Wraps `function`, identified by `name` in cache keys and telemetry.
    ///
    /// `function` takes the call arguments as a single value, usually a tuple, and
    /// returns a future resolving to the computed value.
    #[must_use]
    pub fn wrap<F>(self, name: impl Into<String>, function: F) -> CachedFunction<F, S, L> {
        CachedFunction {
            name: name.into(),
            function,
            store: self.store,
            lock: self.lock,
            prefix: self.prefix,
            key_format: self.key_format,
            window: self.window,
            settings: RefreshSettings {
                timeout: self.window.timeout(),
                hold_timeout: self.hold_timeout,
                acquire: self.acquire,
            },
            clock: self.clock,
            telemetry: self.telemetry.build(),
        }
    }
}
