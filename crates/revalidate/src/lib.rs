// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Stale-while-revalidate caching of async function results.
//!
//! This crate wraps an expensive async computation so that:
//! - results are stored under a key derived from the function name and its arguments
//! - stored results are served directly while they are fresh
//! - once a result goes stale, exactly one caller per key recomputes it under a
//!   lock while everyone else keeps getting the stale result
//! - callers that find nothing stored while someone else recomputes get a
//!   [`Error::ColdCache`] instead of piling onto the computation
//!
//! Storage and locking are pluggable through the [`Store`] and [`Lock`] traits.
//! `revalidate_memory` provides an in-process backend and `revalidate_redis` a
//! backend shared between processes.
//!
//! # Examples
//!
//! ```
//! use revalidate::{Outcome, cached_function};
//! use revalidate_memory::InMemoryStore;
//! use std::time::Duration;
//! use tick::ClockControl;
//!
//! # futures::executor::block_on(async {
//! let control = ClockControl::new();
//! let store = InMemoryStore::new(control.to_clock());
//!
//! // Keep results for a minute, recompute after 50 seconds.
//! let forecast = cached_function(Duration::from_secs(60), Duration::from_secs(50))
//!     .prefix("weather")
//!     .backend(store)
//!     .wrap("forecast", |(city,): (&'static str,)| async move {
//!         Ok::<_, std::io::Error>(format!("sunny in {city}"))
//!     });
//!
//! let first = forecast.call_with_outcome(("Oslo",)).await?;
//! assert_eq!(first, Outcome::Refreshed("sunny in Oslo".to_string()));
//!
//! control.advance(Duration::from_secs(30));
//! let second = forecast.call_with_outcome(("Oslo",)).await?;
//! assert_eq!(second, Outcome::Fresh("sunny in Oslo".to_string()));
//! # Ok::<(), revalidate::Error<std::io::Error>>(())
//! # });
//! ```
//!
//! # Features
//!
//! - `logs`: emit a `tracing` event for every call, enabled per function with
//!   [`CachedFunctionBuilder::logs`].
//! - `metrics`: count call outcomes and time computations with OpenTelemetry,
//!   enabled per function with [`CachedFunctionBuilder::metrics`].
//! - `test-util`: re-export the mock backend from `revalidate_store`.

pub mod builder;
pub mod cached;
mod error;
pub mod freshness;
pub mod key;
pub mod refresh;
mod telemetry;

#[doc(inline)]
pub use builder::{CachedFunctionBuilder, DEFAULT_HOLD_TIMEOUT, cached_function};
#[doc(inline)]
pub use cached::CachedFunction;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use freshness::FreshnessWindow;
#[doc(inline)]
pub use key::{CacheKey, CallSignature, KeyFormat, LOCK_PREFIX, SignatureArgs, build_canonical_key, build_key, lock_key_for};
#[doc(inline)]
pub use refresh::Outcome;
#[doc(inline)]
pub use revalidate_store::{AcquirePolicy, CachedEntry, Lock, LockGuard, Store, Ttl};
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use revalidate_store::testing::{MockLockGuard, MockStore, StoreOp};
