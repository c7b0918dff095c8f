// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::{
    InstrumentationScope,
    metrics::{Counter, Histogram, Meter, MeterProvider},
};

const METER_NAME: &str = "revalidate";
const VERSION: &str = "v0.1.0";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";
const EVENT_COUNT_NAME: &str = "revalidate.event.count";
const COMPUTE_DURATION_NAME: &str = "revalidate.compute.duration";

#[cfg_attr(
    not(any(feature = "metrics", test)),
    expect(dead_code, reason = "meters are only created when metrics are enabled")
)]
pub(crate) fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
}

pub(crate) fn create_event_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter(EVENT_COUNT_NAME)
        .with_description("Cached function call outcomes")
        .with_unit("{event}")
        .build()
}

pub(crate) fn create_compute_duration_histogram(meter: &Meter) -> Histogram<f64> {
    meter
        .f64_histogram(COMPUTE_DURATION_NAME)
        .with_description("Duration of wrapped computations")
        .with_unit("s")
        .build()
}
