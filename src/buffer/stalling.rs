//! # Stalling buffer.
//!
//! Fixed capacity with **producer backpressure**: `add` suspends until the
//! consumer frees a slot. Nothing is ever dropped while the buffer is open.
//!
//! ## Slot accounting
//! ```text
//! Semaphore(capacity)
//!   add(v)  ── acquire permit (may wait) ── forget ──► push v
//!   next()  ── pop v ────────────────────────────────► add_permits(1)
//!   close() ── Semaphore::close() ───────────────────► waiting add() returns, v dropped
//! ```
//!
//! A seeded value takes a permit when one is free; otherwise it is recorded as
//! an overdraft so popping it does not grow the capacity.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::{Buffer, Message, queue::MessageQueue};
use crate::policies::BufferPolicy;

struct Inner<T> {
    queue: MessageQueue<T>,
    /// Values admitted without a permit.
    overdraft: usize,
}

/// Buffer built by [`BufferPolicy::Stalling`].
pub struct StallingBuffer<T> {
    capacity: usize,
    slots: Semaphore,
    inner: Mutex<Inner<T>>,
}

impl<T> StallingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` values (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Semaphore::new(capacity),
            inner: Mutex::new(Inner {
                queue: MessageQueue::with_capacity(capacity),
                overdraft: 0,
            }),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Buffer<T> for StallingBuffer<T> {
    async fn add(&self, value: T) {
        match self.slots.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_closed) => {
                tracing::trace!(policy = "stalling", "value dropped: buffer closed");
                return;
            }
        }

        let mut inner = self.inner.lock();
        if inner.queue.is_closed() {
            tracing::trace!(policy = "stalling", "value dropped: buffer closed");
            return;
        }
        inner.queue.push(value);
    }

    fn seed(&self, value: T) {
        let mut inner = self.inner.lock();
        if inner.queue.is_closed() {
            return;
        }
        match self.slots.try_acquire() {
            Ok(permit) => permit.forget(),
            Err(_) => inner.overdraft += 1,
        }
        inner.queue.push(value);
    }

    fn next(&self) -> Option<Message<T>> {
        let msg = {
            let mut inner = self.inner.lock();
            let msg = inner.queue.pop_message();
            if matches!(msg, Some(Message::Element(_))) && inner.overdraft > 0 {
                inner.overdraft -= 1;
                return msg;
            }
            msg
        };
        if matches!(msg, Some(Message::Element(_))) {
            self.slots.add_permits(1);
        }
        msg
    }

    fn close(&self) {
        self.inner.lock().queue.close();
        self.slots.close();
    }

    fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    fn is_closed(&self) -> bool {
        self.inner.lock().queue.is_closed()
    }

    fn policy(&self) -> BufferPolicy {
        BufferPolicy::Stalling {
            capacity: self.capacity,
        }
    }
}
