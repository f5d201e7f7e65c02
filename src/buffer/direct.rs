//! # Direct (rendezvous) buffer.
//!
//! Stores no emitted values. A value reaches the consumer only when the
//! [`Subscriber`](crate::core::Subscriber) finds it already parked in `next()` and
//! hands the value over without touching the buffer; anything that reaches
//! [`Buffer::add`] is discarded.
//!
//! Two things are still kept so the consumer never waits forever:
//! - the registration seed of a state flow ([`Buffer::seed`]);
//! - the end-of-stream marker ([`Buffer::close`]).

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Buffer, Message, queue::MessageQueue};
use crate::policies::BufferPolicy;

/// Buffer built by [`BufferPolicy::Direct`].
pub struct DirectBuffer<T> {
    queue: Mutex<MessageQueue<T>>,
}

impl<T> DirectBuffer<T> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(MessageQueue::new()),
        }
    }
}

impl<T> Default for DirectBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> Buffer<T> for DirectBuffer<T> {
    async fn add(&self, value: T) {
        drop(value);
        tracing::trace!(policy = "direct", "value dropped: no waiting consumer");
    }

    fn seed(&self, value: T) {
        let mut q = self.queue.lock();
        if !q.is_closed() {
            q.push(value);
        }
    }

    fn next(&self) -> Option<Message<T>> {
        self.queue.lock().pop_message()
    }

    fn close(&self) {
        self.queue.lock().close();
    }

    fn len(&self) -> usize {
        self.queue.lock().len()
    }

    fn is_closed(&self) -> bool {
        self.queue.lock().is_closed()
    }

    fn policy(&self) -> BufferPolicy {
        BufferPolicy::Direct
    }
}
