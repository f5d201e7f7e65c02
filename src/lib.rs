//! # flowcast
//!
//! **flowcast** is an in-process reactive-stream library for Tokio.
//!
//! Producers broadcast values to any number of pull-based consumers. Each
//! consumer owns a buffer whose policy decides what happens when it falls
//! behind: grow, drop the oldest value, make the producer wait, or hand off
//! only when the consumer is already waiting.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   MutableSharedFlow        MutableStateFlow            ColdFlow
//!   (no replay)              (latest value)              (builder per subscription)
//!        │ emit                   │ emit                      │ subscribe
//!        ▼                        ▼                           ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Publisher                                                           │
//! │  - registry: SubscriberId → Weak<Subscriber>                         │
//! │  - pending queue + in-flight flag (one drainer at a time)            │
//! │  - current value (state flows)                                       │
//! └──────┬──────────────────────┬──────────────────────┬─────────────────┘
//!        ▼ send(v)              ▼ send(v)              ▼ send(v)
//!   ┌──────────┐           ┌──────────┐           ┌──────────┐
//!   │Subscriber│           │Subscriber│           │Subscriber│
//!   │ Buffer   │           │ Buffer   │           │ Buffer   │
//!   │ Waiter?  │           │ Waiter?  │           │ Waiter?  │
//!   └────┬─────┘           └────┬─────┘           └────┬─────┘
//!        ▼                      ▼                      ▼
//!   Subscription           Subscription           Subscription
//!   recv / next / into_stream
//! ```
//!
//! ### Delivery
//! ```text
//! emit(v)
//!   ├─► enqueue (seq)
//!   ├─► drain (or wait for the running drainer to pass seq)
//!   │     for each live subscriber:
//!   │       ├─ consumer parked   ─► resume it with v
//!   │       └─ otherwise         ─► Buffer::add(v)
//!   │                               ├─ Unbounded ─► push
//!   │                               ├─ Sliding   ─► evict oldest, push
//!   │                               ├─ Stalling  ─► wait for a free slot
//!   │                               └─ Direct    ─► drop
//!   └─► return once v reached every subscriber
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                              |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------------|
//! | **Hot flows**     | Broadcast to current subscribers, with or without a value.   | [`MutableSharedFlow`], [`MutableStateFlow`]     |
//! | **Projections**   | Read-only views without `emit`.                              | [`SharedFlow`], [`StateFlow`]                   |
//! | **Cold flows**    | Restart a producing computation per subscription.            | [`ColdFlow`], [`Emitter`]                       |
//! | **Consumption**   | Pull values or adapt to a `futures::Stream`.                 | [`Flow`], [`Subscription`]                      |
//! | **Backpressure**  | Per-subscriber buffer policies.                              | [`BufferPolicy`]                                |
//! | **Errors**        | Typed errors for cancellation and builder failures.          | [`FlowError`]                                   |
//! | **Configuration** | Policy and log label per flow.                               | [`FlowConfig`]                                  |
//!
//! ## Example
//! ```rust
//! use flowcast::{BufferPolicy, Flow, MutableStateFlow};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let temperature = MutableStateFlow::with_policy(20, BufferPolicy::Sliding { capacity: 1 });
//!     let mut readings = temperature.subscribe();
//!
//!     // First pull registers and yields the current value.
//!     assert_eq!(readings.next().await, Some(20));
//!
//!     temperature.emit(21).await;
//!     temperature.emit(22).await;
//!
//!     // Sliding(1) keeps only the newest pending value.
//!     assert_eq!(readings.next().await, Some(22));
//!     assert_eq!(temperature.value(), 22);
//! }
//! ```
mod buffer;
mod config;
mod core;
mod error;
mod flows;
mod policies;

// ---- Public re-exports ----

pub use config::FlowConfig;
pub use self::core::{SubscriberId, Subscription};
pub use error::FlowError;
pub use flows::{ColdFlow, Emitter, Flow, MutableSharedFlow, MutableStateFlow, SharedFlow, StateFlow};
pub use policies::BufferPolicy;
