// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Store and lock abstractions for stale-while-revalidate caching.
//!
//! This crate defines the two collaborators that the `revalidate` cache consumes:
//!
//! - [`Store`]: a key-value store with per-key expiry and remaining-lifetime
//!   introspection ([`Ttl`]).
//! - [`Lock`]: a named mutual-exclusion primitive with a hold timeout, an
//!   [`AcquirePolicy`] and a [`LockGuard`] that releases the lock.
//!
//! Backends usually implement both traits on the same type, since the lock is
//! expected to live in the same shared namespace as the cached values.
//!
//! # Implementing a Store
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//! use std::time::Duration;
//!
//! use revalidate_store::{Error, Store, Ttl};
//!
//! struct NeverExpires(Mutex<HashMap<String, i32>>);
//!
//! impl Store<i32> for NeverExpires {
//!     async fn get(&self, key: &str) -> Result<Option<i32>, Error> {
//!         Ok(self.0.lock().unwrap().get(key).copied())
//!     }
//!
//!     async fn set(&self, key: &str, value: i32, _timeout: Duration) -> Result<(), Error> {
//!         self.0.lock().unwrap().insert(key.to_string(), value);
//!         Ok(())
//!     }
//!
//!     async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
//!         Ok(if self.0.lock().unwrap().contains_key(key) {
//!             Ttl::Persistent
//!         } else {
//!             Ttl::Missing
//!         })
//!     }
//! }
//! ```

mod entry;
pub mod error;
mod lock;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use entry::{CachedEntry, Ttl};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use lock::{AcquirePolicy, Lock, LockGuard};
#[doc(inline)]
pub use store::Store;
