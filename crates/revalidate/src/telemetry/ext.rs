// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Extension traits for telemetry recording.

use std::time::Duration;

use tick::Clock;

use crate::telemetry::{Activity, Telemetry};

/// Result of a timed async operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimedResult<R> {
    pub result: R,
    /// `None` when no clock was configured.
    pub duration: Option<Duration>,
}

/// Times `f` against `clock`, if there is one.
pub(crate) async fn timed<F>(clock: Option<&Clock>, f: F) -> TimedResult<F::Output>
where
    F: Future,
{
    let stopwatch = clock.map(Clock::stopwatch);
    let result = f.await;
    TimedResult {
        result,
        duration: stopwatch.map(|s| s.elapsed()),
    }
}

pub(crate) trait TelemetryExt {
    /// Records an activity if telemetry is enabled.
    fn record(&self, name: &str, key: &str, activity: Activity, duration: Option<Duration>);
}

impl TelemetryExt for Option<Telemetry> {
    #[allow(unused_variables, reason = "No-op when telemetry is disabled")]
    fn record(&self, name: &str, key: &str, activity: Activity, duration: Option<Duration>) {
        #[cfg(any(feature = "logs", feature = "metrics", test))]
        if let Some(t) = self {
            t.record(name, key, activity, duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn timed_measures_duration() {
        block_on(async {
            let control = tick::ClockControl::new();
            let clock = control.to_clock();

            let timed = timed(Some(&clock), async {
                control.advance(Duration::from_millis(100));
                42
            })
            .await;

            assert_eq!(timed.result, 42);
            assert_eq!(timed.duration, Some(Duration::from_millis(100)));
        });
    }

    #[test]
    fn timed_without_clock_has_no_duration() {
        let timed = block_on(timed(None, async { "done" }));
        assert_eq!(timed.result, "done");
        assert_eq!(timed.duration, None);
    }

    #[test]
    fn disabled_telemetry_emits_no_logs() {
        use crate::telemetry::testing::LogCapture;

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let telemetry: Option<Telemetry> = None;
        telemetry.record("cache", "k", Activity::Cold, Some(Duration::from_millis(1)));

        assert!(capture.output().is_empty());
    }
}
