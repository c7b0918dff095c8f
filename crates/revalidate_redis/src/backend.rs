// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use redis::aio::ConnectionManager;
use revalidate_store::{AcquirePolicy, CachedEntry, Error, Lock, Store, Ttl};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tick::Clock;

use crate::codec::{MAX_PX_MILLIS, decode, encode, px_millis};
use crate::lock::{RedisLockGuard, new_token};

/// Delay between attempts while waiting for a held lock.
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// A [`Store`] and [`Lock`] backed by a Redis server.
///
/// Cloning is cheap: clones share the multiplexed connection.
#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
    clock: Clock,
    retry_interval: Duration,
}

impl RedisBackend {
    /// Opens a managed connection to the server at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server cannot be reached.
    pub async fn connect(url: &str, clock: Clock) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(Error::from_source)?;
        let connection = client.get_connection_manager().await.map_err(Error::from_source)?;
        Ok(Self::new(connection, clock))
    }

    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(connection: ConnectionManager, clock: Clock) -> Self {
        Self {
            connection,
            clock,
            retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
        }
    }

    /// Sets the delay between lock attempts under [`AcquirePolicy::Wait`].
    ///
    /// Intervals shorter than one millisecond are raised to one millisecond.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Returns the delay between lock attempts.
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    async fn try_take(&self, lock_key: &str, token: &str, hold_timeout: Duration) -> Result<bool, Error> {
        let mut connection = self.connection.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(lock_key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(px_millis(hold_timeout).unwrap_or(MAX_PX_MILLIS))
            .query_async(&mut connection)
            .await
            .map_err(Error::from_source)?;
        Ok(reply.is_some())
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

impl<V> Store<V> for RedisBackend
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<V>, Error> {
        let mut connection = self.connection.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(Error::from_source)?;
        payload.as_deref().map(decode).transpose()
    }

    async fn set(&self, key: &str, value: V, timeout: Duration) -> Result<(), Error> {
        let mut connection = self.connection.clone();

        // PX rejects zero, and a zero lifetime means the value is already gone.
        if timeout.is_zero() {
            let _: i64 = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut connection)
                .await
                .map_err(Error::from_source)?;
            return Ok(());
        }

        let mut command = redis::cmd("SET");
        command.arg(key).arg(encode(&value)?);
        // Lifetimes the server cannot represent are stored without expiry.
        if let Some(millis) = px_millis(timeout) {
            command.arg("PX").arg(millis);
        }
        let _: () = command
            .query_async(&mut connection)
            .await
            .map_err(Error::from_source)?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
        let mut connection = self.connection.clone();
        let millis: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(Error::from_source)?;
        Ok(Ttl::from_pttl_millis(millis))
    }

    async fn entry(&self, key: &str) -> Result<Option<CachedEntry<V>>, Error> {
        let mut connection = self.connection.clone();
        let (payload, millis): (Option<String>, i64) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut connection)
            .await
            .map_err(Error::from_source)?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        Ok(Some(CachedEntry::new(decode(&payload)?, Ttl::from_pttl_millis(millis))))
    }
}

impl Lock for RedisBackend {
    type Guard = RedisLockGuard;

    async fn try_acquire(
        &self,
        lock_key: &str,
        hold_timeout: Duration,
        policy: AcquirePolicy,
    ) -> Result<Option<Self::Guard>, Error> {
        let max_wait = policy.max_wait();
        let stopwatch = self.clock.stopwatch();
        let token = new_token();

        loop {
            if self.try_take(lock_key, &token, hold_timeout).await? {
                return Ok(Some(RedisLockGuard::new(
                    self.connection.clone(),
                    lock_key.to_string(),
                    token,
                )));
            }

            let waited = stopwatch.elapsed();
            if waited >= max_wait {
                return Ok(None);
            }

            self.clock.delay(self.retry_interval.min(max_wait - waited)).await;
        }
    }
}
