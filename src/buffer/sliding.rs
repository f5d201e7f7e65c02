//! # Sliding buffer.
//!
//! Fixed capacity; on overflow the **oldest** pending value is evicted so the
//! newest one always fits. Producers never suspend.
//!
//! ```text
//! capacity = 3
//! add 1,2,3   → [1, 2, 3]
//! add 4       → [2, 3, 4]   (1 evicted)
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Buffer, Message, queue::MessageQueue};
use crate::policies::BufferPolicy;

/// Buffer built by [`BufferPolicy::Sliding`].
pub struct SlidingBuffer<T> {
    capacity: usize,
    queue: Mutex<MessageQueue<T>>,
}

impl<T> SlidingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` values (min 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: Mutex::new(MessageQueue::with_capacity(capacity)),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Buffer<T> for SlidingBuffer<T> {
    async fn add(&self, value: T) {
        self.seed(value);
    }

    fn seed(&self, value: T) {
        let mut q = self.queue.lock();
        if q.is_closed() {
            tracing::trace!(policy = "sliding", "value dropped: buffer closed");
            return;
        }
        if q.len() >= self.capacity && q.pop_oldest().is_some() {
            tracing::trace!(
                policy = "sliding",
                capacity = self.capacity,
                "oldest value evicted"
            );
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
        BufferPolicy::Sliding {
            capacity: self.capacity,
        }
    }
}
