// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process store and lock backend for `revalidate`.
//!
//! [`InMemoryStore`] keeps values with per-key expiry and a table of named locks,
//! both measured against a [`tick::Clock`]. Cloning the store is cheap and every
//! clone shares the same data, so a single instance can serve as both the
//! [`Store`](revalidate_store::Store) and the [`Lock`](revalidate_store::Lock) of a
//! cached function.
//!
//! # Quick Start
//!
//! ```
//! use revalidate_memory::InMemoryStore;
//! use revalidate_store::{Store, Ttl};
//! use std::time::Duration;
//! use tick::ClockControl;
//!
//! # futures::executor::block_on(async {
//! let control = ClockControl::new();
//! let store = InMemoryStore::<u32>::new(control.to_clock());
//!
//! store.set("answer", 42, Duration::from_secs(60)).await?;
//! control.advance(Duration::from_secs(20));
//!
//! assert_eq!(store.get("answer").await?, Some(42));
//! assert_eq!(store.ttl("answer").await?, Ttl::Expires(Duration::from_secs(40)));
//! # Ok::<(), revalidate_store::Error>(())
//! # });
//! ```
//!
//! # Locks
//!
//! Locks expire after the hold timeout passed to
//! [`try_acquire`](revalidate_store::Lock::try_acquire) and may then be taken
//! over by another caller. Dropping an [`InMemoryLockGuard`] frees the lock
//! immediately, even without an explicit release.

pub mod builder;
mod lock;
pub mod store;

#[doc(inline)]
pub use builder::InMemoryStoreBuilder;
#[doc(inline)]
pub use lock::InMemoryLockGuard;
#[doc(inline)]
pub use store::InMemoryStore;
