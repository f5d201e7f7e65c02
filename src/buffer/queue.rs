//! Shared FIFO state used by every buffer implementation.

use std::collections::VecDeque;

use super::Message;

/// Pending values plus the close flag.
///
/// The close marker is never stored: it is synthesized once the queue is
/// drained, which keeps it behind every buffered value.
pub(super) struct MessageQueue<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> MessageQueue<T> {
    pub(super) fn new() -> Self {
        Self {
            items: VecDeque::new(),
            closed: false,
        }
    }

    pub(super) fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            closed: false,
        }
    }

    #[inline]
    pub(super) fn push(&mut self, value: T) {
        self.items.push_back(value);
    }

    #[inline]
    pub(super) fn pop_oldest(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Oldest value, or the close marker once drained and closed.
    pub(super) fn pop_message(&mut self) -> Option<Message<T>> {
        match self.items.pop_front() {
            Some(v) => Some(Message::Element(v)),
            None if self.closed => Some(Message::Close),
            None => None,
        }
    }

    #[inline]
    pub(super) fn close(&mut self) {
        self.closed = true;
    }

    #[inline]
    pub(super) fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.items.len()
    }
}
