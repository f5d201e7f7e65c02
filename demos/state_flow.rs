//! # Example: state_flow
//!
//! A sensor publishes readings into a [`MutableStateFlow`]; two dashboards
//! consume them at different speeds.
//!
//! Demonstrates how to:
//! - Seed late subscribers with the current value.
//! - Pick a buffer policy per flow (`Sliding` keeps only fresh readings).
//! - Subscribe through a read-only [`StateFlow`](flowcast::StateFlow) projection.
//! - End every subscription by dropping the last flow handle.
//!
//! ## Flow
//! ```text
//! sensor ──► MutableStateFlow::emit ──► Publisher ──┬──► fast dashboard (every reading)
//!                                                   └──► slow dashboard (sliding: newest only)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example state_flow
//! ```

use std::time::Duration;

use flowcast::{BufferPolicy, Flow, FlowConfig, MutableStateFlow, Subscription};

async fn dashboard(name: &'static str, mut sub: Subscription<f64>, pause: Duration) {
    while let Some(celsius) = sub.next().await {
        println!("[{name}] {celsius:.1} °C");
        tokio::time::sleep(pause).await;
    }
    println!("[{name}] sensor gone");
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cfg = FlowConfig::new(BufferPolicy::Sliding { capacity: 2 }).with_label("temperature");
    let sensor = MutableStateFlow::with_config(20.0, cfg);

    let view = sensor.as_state_flow();
    let fast = tokio::spawn(dashboard("fast", view.subscribe(), Duration::from_millis(5)));
    let slow = tokio::spawn(dashboard("slow", view.subscribe(), Duration::from_millis(60)));
    drop(view);

    while sensor.subscription_count() < 2 {
        tokio::task::yield_now().await;
    }

    for step in 1..=10 {
        sensor.emit(20.0 + f64::from(step) * 0.3).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    println!("[sensor] last reading {:.1} °C", sensor.value());

    // Subscriptions do not keep the flow alive: once the last handle is gone
    // the dashboards drain what they buffered and see end-of-stream.
    drop(sensor);
    let _ = tokio::join!(fast, slow);
}
