// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis store and lock backend for `revalidate`.
//!
//! [`RedisBackend`] implements [`Store`](revalidate_store::Store) for any value
//! that serializes with `serde`, and [`Lock`](revalidate_store::Lock) through
//! `SET NX PX`. Every process pointed at the same Redis server shares cached
//! values and lock ownership, so a stale key is recomputed once across the whole
//! fleet.
//!
//! # Quick Start
//!
//! ```no_run
//! use revalidate_redis::RedisBackend;
//! use revalidate_store::Store;
//! use std::time::Duration;
//! use tick::Clock;
//!
//! # async fn run() -> Result<(), revalidate_store::Error> {
//! let backend = RedisBackend::connect("redis://127.0.0.1/", Clock::new_tokio()).await?;
//!
//! backend.set("answer", 42_u32, Duration::from_secs(60)).await?;
//! let value: Option<u32> = backend.get("answer").await?;
//! assert_eq!(value, Some(42));
//! # Ok(())
//! # }
//! ```
//!
//! # Lock Ownership
//!
//! Each acquisition writes a fresh random token to the lock key. Release runs a
//! script that deletes the key only while it still holds that token, so a caller
//! whose hold timeout already expired can never free a lock taken over by
//! someone else. Dropping a [`RedisLockGuard`] without releasing leaves the lock
//! to expire on the server.

mod backend;
mod codec;
mod lock;

#[doc(inline)]
pub use backend::{DEFAULT_LOCK_RETRY_INTERVAL, RedisBackend};
#[doc(inline)]
pub use lock::RedisLockGuard;
