// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Errors returned by cached function calls.

/// An error from a [`CachedFunction`](crate::CachedFunction) call.
///
/// `E` is the error type of the wrapped computation, which is carried unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// No cached value exists and another caller holds the recomputation lock.
    #[error("no cached value for `{key}` while another caller is recomputing it")]
    ColdCache {
        /// The cache key that was requested.
        key: String,
    },

    /// The wrapped computation failed.
    #[error(transparent)]
    Computation(E),

    /// The store or lock backend failed.
    #[error("cache backend failed")]
    Store(#[from] revalidate_store::Error),
}

impl<E> Error<E> {
    /// Returns `true` for [`Error::ColdCache`].
    #[must_use]
    pub fn is_cold_cache(&self) -> bool {
        matches!(self, Self::ColdCache { .. })
    }

    /// Returns the computation's error, if that is what failed.
    #[must_use]
    pub fn computation(&self) -> Option<&E> {
        match self {
            Self::Computation(error) => Some(error),
            _ => None,
        }
    }

    /// Converts into the computation's error, if that is what failed.
    #[must_use]
    pub fn into_computation(self) -> Option<E> {
        match self {
            Self::Computation(error) => Some(error),
            _ => None,
        }
    }
}
