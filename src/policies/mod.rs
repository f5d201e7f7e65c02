//! Backpressure policies.
//!
//! This module groups the knob that controls **what happens when a producer
//! outpaces a consumer**: block, drop the oldest value, hand off only to a
//! waiting consumer, or grow without bound.
//!
//! ## Contents
//! - [`BufferPolicy`] factory descriptor for per-subscriber buffers
//!
//! ## Quick wiring
//! ```text
//! FlowConfig { policy: BufferPolicy, .. }
//!      └─► flow.subscribe():
//!           - policy.build::<T>() → fresh Box<dyn Buffer<T>> per subscriber
//!           - Subscriber::new(buffer, Weak<Publisher>)
//! ```
//!
//! ## Defaults
//! - `BufferPolicy::Stalling { capacity: 5 }` (no loss, producer waits).

mod buffer;

pub use buffer::BufferPolicy;
