// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for store and lock operations.

use std::borrow::Cow;

/// An error from a store or lock backend.
///
/// This is an opaque error type wrapping whatever the backend reported. Use
/// [`std::error::Error::source()`] to reach the underlying cause.
///
/// # Examples
///
/// ```
/// use revalidate_store::Error;
///
/// let error = Error::from_message("connection refused");
/// assert!(error.to_string().contains("connection refused"));
/// ```
#[ohno::error]
pub struct Error {
    /// Set when a release found the lock owned by someone else.
    lock_key: Option<String>,
}

impl Error {
    /// Creates an error from a plain message.
    pub fn from_message(message: impl Into<Cow<'static, str>>) -> Self {
        Self::caused_by(None::<String>, message.into())
    }

    /// Creates an error wrapping a backend error.
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::caused_by(None::<String>, source)
    }

    /// Creates the error reported when releasing a lock that is no longer ours.
    pub fn lock_not_owned(lock_key: impl Into<String>) -> Self {
        let lock_key = lock_key.into();
        let message = format!("lock `{lock_key}` is not held by this owner");
        Self::caused_by(lock_key, message)
    }

    /// Returns `true` if a release failed because the lock changed owner.
    #[must_use]
    pub fn is_lock_not_owned(&self) -> bool {
        self.lock_key.is_some()
    }
}

/// A specialized [`Result`] type for store and lock operations.
pub type Result<T> = std::result::Result<T, Error>;
