//! # Per-subscriber buffers.
//!
//! A [`Buffer`] is the ordered container that sits between a publisher's
//! fan-out and one consumer. It is owned by exactly one
//! [`Subscriber`](crate::core::Subscriber) and built from a
//! [`BufferPolicy`](crate::BufferPolicy).
//!
//! ## Architecture
//! ```text
//! Publisher::drain ── send(v) ──► Subscriber ──┬──► parked consumer? resume directly
//!                                              │
//!                                              └──► Buffer::add(v)
//!                                                     ├─ Unbounded: push
//!                                                     ├─ Sliding:   evict oldest, push
//!                                                     ├─ Stalling:  wait for a slot, push
//!                                                     └─ Direct:    drop
//!
//! Subscriber::next ──► Buffer::next() ──► Element(v) | Close | nothing pending
//! ```
//!
//! ## Rules
//! - **FIFO**: `next()` always yields the oldest pending value.
//! - **Close is terminal**: after [`Buffer::close`], pending values are still
//!   drained, then `next()` keeps returning [`Message::Close`]; later `add` calls
//!   are discarded.
//! - **Seed never drops**: [`Buffer::seed`] admits one value without suspending,
//!   whatever the policy (used for state-flow registration).
//! - **Thread-safe**: `add` and `next` may run concurrently from different tasks.

mod direct;
mod queue;
mod sliding;
mod stalling;
mod unbounded;

pub(crate) use direct::DirectBuffer;
pub(crate) use sliding::SlidingBuffer;
pub(crate) use stalling::StallingBuffer;
pub(crate) use unbounded::UnboundedBuffer;

use async_trait::async_trait;

use crate::policies::BufferPolicy;

/// Item travelling through a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    /// A value emitted by the producer.
    Element(T),
    /// End-of-stream marker.
    Close,
}

/// Contract for per-subscriber buffers.
///
/// Implementations guard their own state; callers never hold a lock across
/// [`Buffer::add`].
#[async_trait]
pub trait Buffer<T>: Send + Sync {
    /// Admits a value according to the policy.
    ///
    /// May suspend (only `Stalling` does) until space is available or the
    /// buffer is closed. Values admitted after close are discarded.
    async fn add(&self, value: T);

    /// Admits a value without suspending and without dropping it.
    fn seed(&self, value: T);

    /// Removes and returns the oldest pending message.
    ///
    /// Returns `None` when nothing is pending and the buffer is still open.
    fn next(&self) -> Option<Message<T>>;

    /// Marks end-of-stream and releases producers suspended in [`Buffer::add`].
    fn close(&self);

    /// Number of pending values (the close marker is not counted).
    fn len(&self) -> usize;

    /// True if no value is pending.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once [`Buffer::close`] was called.
    fn is_closed(&self) -> bool;

    /// Policy this buffer was built from.
    fn policy(&self) -> BufferPolicy;
}
