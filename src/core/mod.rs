//! Broadcast core shared by every flow variant.
//!
//! Internal modules:
//! - [`publisher`]: subscriber registry, linearized emission and fan-out;
//! - [`subscriber`]: per-consumer buffer plus one parked wait;
//! - [`subscription`]: consumer handle, pull primitive and stream adapter;
//! - [`waiter`]: one-shot resolution of a parked wait.

mod publisher;
mod subscriber;
mod subscription;
mod waiter;

pub(crate) use publisher::Publisher;
pub(crate) use subscriber::Subscriber;
pub use subscriber::SubscriberId;
pub use subscription::Subscription;
