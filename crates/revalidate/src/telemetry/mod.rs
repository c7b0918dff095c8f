// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Telemetry for cached function calls.
//!
//! Every call ends in one activity. When the `logs` feature is enabled and logging
//! is switched on for a function, the activity is emitted as a structured `tracing`
//! event. When the `metrics` feature is enabled and a meter provider is configured,
//! activities are counted and computation durations recorded through OpenTelemetry.

#[cfg(any(feature = "logs", test))]
use opentelemetry::logs::Severity;

#[cfg(any(feature = "logs", feature = "metrics", test))]
pub(crate) mod attributes;
pub(crate) mod config;
pub(crate) mod ext;
#[cfg(any(feature = "logs", feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(any(feature = "logs", feature = "metrics", test))]
mod recorder;
#[cfg(test)]
pub(crate) mod testing;

#[cfg(any(feature = "logs", feature = "metrics", test))]
pub(crate) use recorder::Telemetry;

/// Stand-in used when telemetry is compiled out.
#[cfg(not(any(feature = "logs", feature = "metrics", test)))]
#[derive(Clone, Debug)]
pub(crate) struct Telemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activity {
    Fresh,
    Refreshed,
    Stale,
    Cold,
    ComputeFailed,
    StoreFailed,
    ReleaseFailed,
}

impl Activity {
    #[cfg(any(feature = "logs", feature = "metrics", test))]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Refreshed => "refreshed",
            Self::Stale => "stale",
            Self::Cold => "cold",
            Self::ComputeFailed => "compute_failed",
            Self::StoreFailed => "store_failed",
            Self::ReleaseFailed => "release_failed",
        }
    }

    #[cfg(any(feature = "logs", test))]
    pub fn severity(self) -> Severity {
        match self {
            Self::Fresh => Severity::Debug,
            Self::Refreshed | Self::Stale => Severity::Info,
            Self::Cold | Self::ReleaseFailed => Severity::Warn,
            Self::ComputeFailed | Self::StoreFailed => Severity::Error,
        }
    }
}
