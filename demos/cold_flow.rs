//! # Example: cold_flow
//!
//! A [`ColdFlow`] that pages through a fake remote listing. Every subscription
//! runs the builder from the first page again.
//!
//! Demonstrates how to:
//! - Write a builder that stops cleanly once the consumer leaves (`emit(..)?`).
//! - Consume a flow as a `futures::Stream`.
//! - Let a builder failure end the stream.
//!
//! ## Flow
//! ```text
//! subscribe() ──► first pull ──► spawn builder ──► emit(page 1) ──► emit(page 2) ──► ... ──► close
//!                                                      │
//!                                       consumer drop ─┴─► Emitter::emit → OwnerExited
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example cold_flow
//! ```

use std::time::Duration;

use flowcast::{BufferPolicy, ColdFlow, Emitter, Flow, FlowError};
use futures::StreamExt;

async fn fetch_page(page: u32) -> Result<Vec<String>, FlowError> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    match page {
        0..=2 => Ok((0..3).map(|i| format!("item-{page}-{i}")).collect()),
        3 => Ok(Vec::new()),
        _ => Err(FlowError::builder("page out of range")),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let listing = ColdFlow::with_policy(
        |out: Emitter<String>| async move {
            for page in 0.. {
                let items = fetch_page(page).await?;
                if items.is_empty() {
                    break;
                }
                for item in items {
                    out.emit(item).await?;
                }
            }
            Ok::<_, FlowError>(())
        },
        BufferPolicy::Stalling { capacity: 2 },
    );

    // Full pass.
    let all: Vec<String> = listing.subscribe().into_stream().collect().await;
    println!("full pass: {} items", all.len());

    // Second pass restarts from page 0; stop after four items.
    let mut sub = listing.subscribe();
    for _ in 0..4 {
        if let Some(item) = sub.next().await {
            println!("partial pass: {item}");
        }
    }
    drop(sub);

    // A failing builder ends the stream without an error on the consumer side.
    let broken = ColdFlow::new(|out: Emitter<u32>| async move {
        out.emit(1).await?;
        Err::<(), _>(FlowError::builder("upstream refused"))
    });
    let mut sub = broken.subscribe();
    println!("broken: {:?}", sub.recv().await);
    println!("broken: {:?}", sub.recv().await);
}
