// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Activity recording.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter},
};
#[cfg(any(feature = "logs", test))]
use opentelemetry::logs::Severity;

use crate::telemetry::{
    Activity, attributes,
    metrics::{create_compute_duration_histogram, create_event_counter},
};

#[derive(Clone, Debug)]
pub(crate) struct Telemetry {
    inner: Arc<TelemetryInner>,
}

#[derive(Debug)]
struct TelemetryInner {
    #[cfg(any(feature = "logs", test))]
    logging_enabled: bool,
    event_counter: Option<Counter<u64>>,
    compute_duration: Option<Histogram<f64>>,
}

impl Telemetry {
    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "logging is compiled out")
    )]
    pub(crate) fn new(logging_enabled: bool, meter: Option<&Meter>) -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                #[cfg(any(feature = "logs", test))]
                logging_enabled,
                event_counter: meter.map(create_event_counter),
                compute_duration: meter.map(create_compute_duration_histogram),
            }),
        }
    }

    /// Records the activity a call ended in.
    ///
    /// `duration` is the time spent in the wrapped computation, when one ran.
    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "the key is only logged")
    )]
    pub(crate) fn record(&self, name: &str, key: &str, activity: Activity, duration: Option<Duration>) {
        let attrs = [
            KeyValue::new(attributes::CACHE_NAME, name.to_string()),
            KeyValue::new(attributes::CACHE_ACTIVITY_NAME, activity.as_str()),
        ];

        if let Some(counter) = &self.inner.event_counter {
            counter.add(1, &attrs);
        }

        if let (Some(d), Some(h)) = (duration, &self.inner.compute_duration) {
            h.record(d.as_secs_f64(), &attrs);
        }

        #[cfg(any(feature = "logs", test))]
        if self.inner.logging_enabled {
            Self::emit(name, key, activity, duration);
        }
    }

    #[cfg(any(feature = "logs", test))]
    fn emit(name: &str, key: &str, activity: Activity, duration: Option<Duration>) {
        let activity_name = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = name,
                    cache.key = key,
                    cache.activity = activity_name,
                    cache.duration_ns = ?duration_ns,
                    "revalidate.event"
                )
            };
        }

        match activity.severity() {
            Severity::Error => emit_event!(error),
            Severity::Warn => emit_event!(warn),
            Severity::Info => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}
