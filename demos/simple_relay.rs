//! Simple relay example with a few sensor channels
//!
//! Run with: cargo run --example simple_relay [POLICY]
//!
//! Examples:
//!   cargo run --example simple_relay                  # synchronous dispatch
//!   cargo run --example simple_relay parallel         # one thread per subscriber
//!   cargo run --example simple_relay fire-and-forget  # deliver in the background
//!
//! Set `RUST_LOG=msg_relay=debug` to see every store and dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use msg_relay::{DispatchPolicy, Payload, Relay, RelayConfig};
use tracing_subscriber::EnvFilter;

/// Collects how much data each subscriber has seen
#[derive(Default)]
struct Counters {
    gps_fixes: AtomicU64,
    wind_samples: AtomicU64,
    bytes: AtomicU64,
}

fn parse_policy(arg: Option<String>) -> DispatchPolicy {
    match arg.as_deref() {
        Some("parallel") => DispatchPolicy::Parallel,
        Some("fire-and-forget") => DispatchPolicy::FireAndForget,
        _ => DispatchPolicy::Synchronous,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("msg_relay=info")),
        )
        .init();

    let policy = parse_policy(std::env::args().nth(1));
    let config = RelayConfig::default()
        .buffer_capacity(32)
        .dispatch_policy(policy)
        .max_concurrent_callbacks(4);

    let relay = Arc::new(Relay::with_config(config));
    let counters = Arc::new(Counters::default());

    let c = Arc::clone(&counters);
    let gps = relay
        .subscribe("gps", move |fix: &Payload| {
            c.gps_fixes.fetch_add(1, Ordering::Relaxed);
            c.bytes.fetch_add(fix.size() as u64, Ordering::Relaxed);
        })
        .await;

    let c = Arc::clone(&counters);
    relay
        .subscribe("wind", move |sample: &Payload| {
            c.wind_samples.fetch_add(1, Ordering::Relaxed);
            c.bytes.fetch_add(sample.size() as u64, Ordering::Relaxed);
        })
        .await;

    relay
        .subscribe("wind", |sample: &Payload| {
            println!("wind: {}", String::from_utf8_lossy(sample.as_bytes()));
        })
        .await;

    // Two publishers on separate tasks
    let gps_relay = Arc::clone(&relay);
    let gps_task = tokio::spawn(async move {
        for i in 0..50u32 {
            let fix = format!("48.{:04},-2.{:04}", i, i * 3);
            gps_relay.publish("gps", fix).await;
        }
    });

    let wind_relay = Arc::clone(&relay);
    let wind_task = tokio::spawn(async move {
        for i in 0..10u32 {
            let sample = format!("{} deg, {} kn", (i * 36) % 360, 10 + i);
            let (handle, report) = wind_relay.publish_with_report("wind", sample).await;
            tracing::info!(handle = %handle, delivered = report.delivered, "Wind published");
        }
    });

    let _ = gps_task.await;
    let _ = wind_task.await;

    if policy == DispatchPolicy::FireAndForget {
        // Give background deliveries a moment to drain
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    relay.unsubscribe("gps", &gps).await;

    for name in relay.channel_names().await {
        if let Some(stats) = relay.stats(&name).await {
            println!(
                "{}: {} published, {} retained (capacity {}), {} subscribers",
                stats.name, stats.published, stats.buffered, stats.capacity, stats.subscriber_count
            );
        }
    }

    println!(
        "gps fixes: {}, wind samples: {}, bytes: {}",
        counters.gps_fixes.load(Ordering::Relaxed),
        counters.wind_samples.load(Ordering::Relaxed),
        counters.bytes.load(Ordering::Relaxed)
    );

    relay.shutdown().await;
}
