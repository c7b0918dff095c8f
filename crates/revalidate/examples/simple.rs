// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Simple Cached Function Example
//!
//! Wraps a slow lookup with an in-memory backend and shows how repeated calls are
//! served from the cache until the value goes stale.

use std::time::Duration;

use revalidate::{Outcome, cached_function};
use revalidate_memory::InMemoryStore;
use tick::Clock;

async fn exchange_rate(from: &str, to: &str) -> Result<f64, std::io::Error> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(if (from, to) == ("EUR", "USD") { 1.08 } else { 1.0 })
}

#[tokio::main]
async fn main() -> Result<(), revalidate::Error<std::io::Error>> {
    let clock = Clock::new_tokio();

    // Values live for 2 seconds and are recomputed once they are older than 1 second.
    let rates = cached_function(Duration::from_secs(2), Duration::from_secs(1))
        .prefix("fx")
        .clock(clock.clone())
        .backend(InMemoryStore::new(clock.clone()))
        .wrap("rate", |(from, to): (&'static str, &'static str)| exchange_rate(from, to));

    println!("key: {}", rates.key_for(&("EUR", "USD")));

    for round in 0..4 {
        let outcome = rates.call_with_outcome(("EUR", "USD")).await?;
        let how = match &outcome {
            Outcome::Fresh(_) => "fresh",
            Outcome::Refreshed(_) => "recomputed",
            Outcome::Stale(_) => "stale",
            Outcome::Cold => "cold",
        };
        println!("round {round}: {:?} ({how})", outcome.value());
        clock.delay(Duration::from_millis(600)).await;
    }

    Ok(())
}
