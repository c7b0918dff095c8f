// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use redis::Script;
use redis::aio::ConnectionManager;
use revalidate_store::{Error, LockGuard};

/// Deletes the lock key only if it still stores the caller's token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

pub(crate) fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A lock held in Redis, acquired through [`RedisBackend`](crate::RedisBackend).
pub struct RedisLockGuard {
    connection: ConnectionManager,
    lock_key: String,
    token: String,
}

impl RedisLockGuard {
    pub(crate) fn new(connection: ConnectionManager, lock_key: String, token: String) -> Self {
        Self {
            connection,
            lock_key,
            token,
        }
    }

    /// The random token identifying this acquisition.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for RedisLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockGuard")
            .field("lock_key", &self.lock_key)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl LockGuard for RedisLockGuard {
    fn lock_key(&self) -> &str {
        &self.lock_key
    }

    async fn release(self) -> Result<(), Error> {
        let Self {
            mut connection,
            lock_key,
            token,
        } = self;

        let deleted: i64 = Script::new(RELEASE_SCRIPT)
            .key(&lock_key)
            .arg(&token)
            .invoke_async(&mut connection)
            .await
            .map_err(Error::from_source)?;

        if deleted == 0 {
            return Err(Error::lock_not_owned(lock_key));
        }
        Ok(())
    }
}
