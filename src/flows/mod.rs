//! # Flow variants.
//!
//! Every variant fans out through a [`Publisher`](crate::core::Publisher) and
//! hands each consumer a [`Subscription`](crate::Subscription) with its own
//! buffer built from the flow's [`FlowConfig`](crate::FlowConfig).
//!
//! ```text
//!                  ┌──────────── hot: one publisher per flow ────────────┐
//! MutableSharedFlow ── emit ──► Publisher ──► sub 1, sub 2, ... (no replay)
//! MutableStateFlow  ── emit ──► Publisher ──► sub 1, sub 2, ... (seeded with value())
//!                  └─────────────────────────────────────────────────────┘
//!
//! ColdFlow::subscribe ──► fresh Publisher + Subscriber
//!                           └─ first recv ─► spawn builder(Emitter) ─► emit ... ─► close
//! ```
//!
//! - [`flow`]: the [`Flow`] trait shared by all variants;
//! - [`shared`]: stateless broadcast;
//! - [`state`]: latest-value holder;
//! - [`cold`]: per-subscription producer.

mod cold;
mod flow;
mod shared;
mod state;

pub use cold::{ColdFlow, Emitter};
pub use flow::Flow;
pub use shared::{MutableSharedFlow, SharedFlow};
pub use state::{MutableStateFlow, StateFlow};
