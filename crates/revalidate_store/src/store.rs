// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The key-value store trait consumed by the cache.

use std::time::Duration;

use crate::{CachedEntry, Error, Ttl};

/// A key-value store with per-key expiry and remaining-lifetime introspection.
///
/// Keys are plain strings; the cache derives them from the computation identity
/// and call arguments. Values are written whole and replaced atomically by
/// [`set`](Store::set), so readers never observe a partially written value.
pub trait Store<V: Send>: Send + Sync {
    /// Reads the value stored under `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Writes `value` under `key`, resetting its lifetime to `timeout`.
    fn set(&self, key: &str, value: V, timeout: Duration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Reports the remaining lifetime of `key`.
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Ttl, Error>> + Send;

    /// Reads the value and its remaining lifetime.
    ///
    /// The default implementation issues [`get`](Store::get) followed by
    /// [`ttl`](Store::ttl). Backends that can read both in one round trip
    /// should override it.
    fn entry(&self, key: &str) -> impl Future<Output = Result<Option<CachedEntry<V>>, Error>> + Send {
        async move {
            let Some(value) = self.get(key).await? else {
                return Ok(None);
            };
            let ttl = self.ttl(key).await?;
            Ok(Some(CachedEntry::new(value, ttl)))
        }
    }
}
