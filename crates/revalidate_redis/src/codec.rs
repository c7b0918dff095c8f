// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversions between cache values, durations and Redis replies.

use std::time::Duration;

use revalidate_store::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub(crate) fn encode<V: Serialize>(value: &V) -> Result<String, Error> {
    serde_json::to_string(value).map_err(Error::from_source)
}

pub(crate) fn decode<V: DeserializeOwned>(payload: &str) -> Result<V, Error> {
    serde_json::from_str(payload).map_err(Error::from_source)
}

/// Largest `PX` argument sent to the server.
///
/// Redis adds `PX` to the current Unix time in milliseconds and rejects sums
/// beyond `i64::MAX`, so the bound leaves headroom for the clock.
pub(crate) const MAX_PX_MILLIS: u64 = 1 << 62;

/// Converts a lifetime to the millisecond argument of `PX`.
///
/// Rounds up so a sub-millisecond lifetime still creates a key. Returns `None`
/// when the lifetime is beyond what the server accepts.
pub(crate) fn px_millis(duration: Duration) -> Option<u64> {
    let millis = duration.as_millis();
    let rounded = if duration.subsec_nanos() % 1_000_000 == 0 { millis } else { millis + 1 };
    u64::try_from(rounded)
        .ok()
        .filter(|&millis| millis <= MAX_PX_MILLIS)
        .map(|millis| millis.max(1))
}
