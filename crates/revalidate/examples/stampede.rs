// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Stampede Example
//!
//! Many tasks ask for the same stale value at once. Exactly one of them recomputes
//! it while every other task is served the stale value immediately.
//!
//! Run with `--features logs` to see one `revalidate.event` per call.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

use revalidate::{Outcome, cached_function};
use revalidate_memory::InMemoryStore;
use tick::Clock;

#[tokio::main]
async fn main() -> Result<(), revalidate::Error<std::io::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let clock = Clock::new_tokio();
    let computations = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&computations);
    let report = Arc::new(
        cached_function(Duration::from_secs(10), Duration::from_millis(500))
            .clock(clock.clone())
            .logs()
            .backend(InMemoryStore::new(clock.clone()))
            .wrap("daily_report", move |(): ()| {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok::<_, std::io::Error>(format!("report #{n}"))
                }
            }),
    );

    // Warm the cache, then let the value go stale.
    report.call(()).await?;
    clock.delay(Duration::from_secs(1)).await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let report = Arc::clone(&report);
            tokio::spawn(async move { report.call_with_outcome(()).await })
        })
        .collect();

    let mut stale = 0;
    for task in tasks {
        match task.await {
            Ok(Ok(Outcome::Stale(_))) => stale += 1,
            Ok(Ok(outcome)) => println!("{outcome:?}"),
            Ok(Err(error)) => return Err(error),
            Err(join) => println!("task failed: {join}"),
        }
    }

    println!(
        "{} computations, {stale} callers served the stale value",
        computations.load(Ordering::Relaxed)
    );
    Ok(())
}
