//! # Unbounded buffer.
//!
//! Grows without limit: `add` never suspends and never drops while open.
//! Memory is the only backpressure, so prefer it for low-rate or bursty flows
//! whose consumers are known to catch up.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Buffer, Message, queue::MessageQueue};
use crate::policies::BufferPolicy;

/// Buffer built by [`BufferPolicy::Unbounded`].
pub struct UnboundedBuffer<T> {
    queue: Mutex<MessageQueue<T>>,
}

impl<T> UnboundedBuffer<T> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(MessageQueue::new()),
        }
    }
}

impl<T> Default for UnboundedBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> Buffer<T> for UnboundedBuffer<T> {
    async fn add(&self, value: T) {
        self.seed(value);
    }

    fn seed(&self, value: T) {
        let mut q = self.queue.lock();
        if q.is_closed() {
            tracing::trace!(policy = "unbounded", "value dropped: buffer closed");
            return;
        }
        q.push(value);
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
        BufferPolicy::Unbounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_everything_in_order() {
        let buf = UnboundedBuffer::new();
        for v in 0..1_000 {
            buf.add(v).await;
        }
        assert_eq!(buf.len(), 1_000);
        for v in 0..1_000 {
            assert_eq!(buf.next(), Some(Message::Element(v)));
        }
        assert_eq!(buf.next(), None);
    }

    #[tokio::test]
    async fn close_is_reported_after_pending_values() {
        let buf = UnboundedBuffer::new();
        buf.add("a").await;
        buf.close();
        buf.add("late").await;

        assert_eq!(buf.next(), Some(Message::Element("a")));
        assert_eq!(buf.next(), Some(Message::Close));
        assert_eq!(buf.next(), Some(Message::Close));
        assert!(buf.is_closed());
    }
}
