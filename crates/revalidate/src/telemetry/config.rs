// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Telemetry configuration collected by the builder.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Meter, MeterProvider};

use crate::telemetry::Telemetry;

/// Which telemetry a cached function emits.
#[derive(Clone, Debug, Default)]
pub(crate) struct TelemetryConfig {
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
}

impl TelemetryConfig {
    #[cfg(any(feature = "logs", test))]
    #[must_use]
    pub(crate) fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub(crate) fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(crate::telemetry::metrics::create_meter(provider));
        self
    }

    /// Builds the recorder, or `None` when nothing is enabled.
    #[cfg(any(feature = "logs", feature = "metrics", test))]
    #[must_use]
    pub(crate) fn build(self) -> Option<Telemetry> {
        #[cfg(any(feature = "logs", test))]
        let logs_enabled = self.logs_enabled;
        #[cfg(not(any(feature = "logs", test)))]
        let logs_enabled = false;

        #[cfg(any(feature = "metrics", test))]
        let meter = self.meter;
        #[cfg(not(any(feature = "metrics", test)))]
        let meter: Option<opentelemetry::metrics::Meter> = None;

        (logs_enabled || meter.is_some()).then(|| Telemetry::new(logs_enabled, meter.as_ref()))
    }

    /// Builds the recorder, or `None` when nothing is enabled.
    #[cfg(not(any(feature = "logs", feature = "metrics", test)))]
    #[must_use]
    pub(crate) fn build(self) -> Option<Telemetry> {
        None
    }
}
