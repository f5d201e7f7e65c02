//! # Buffer policies for subscribers.
//!
//! [`BufferPolicy`] decides how a subscriber's buffer behaves once the consumer
//! falls behind the producer.
//!
//! | Policy                       | Capacity | Producer blocks?    | Loses data?                         |
//! |------------------------------|----------|---------------------|-------------------------------------|
//! | [`BufferPolicy::Unbounded`]  | none     | never               | never                               |
//! | [`BufferPolicy::Sliding`]    | fixed    | never               | drops oldest on overflow            |
//! | [`BufferPolicy::Stalling`]   | fixed    | until a slot frees  | never                               |
//! | [`BufferPolicy::Direct`]     | none     | never               | everything not handed to a waiter   |
//!
//! ## Choosing the right policy
//!
//! **Every value matters, producer may wait**:
//! ```text
//! BufferPolicy::Stalling { capacity }  → emit() suspends while the buffer is full
//! ```
//!
//! **Only recent values matter** (telemetry, UI state):
//! ```text
//! BufferPolicy::Sliding { capacity }   → oldest pending value is evicted
//! ```
//!
//! **Rendezvous** (deliver only to a consumer already waiting):
//! ```text
//! BufferPolicy::Direct                 → nothing is queued
//! ```

use crate::buffer::{Buffer, DirectBuffer, SlidingBuffer, StallingBuffer, UnboundedBuffer};

/// Factory descriptor for per-subscriber buffers.
///
/// A policy is plain data; every subscriber gets a fresh buffer built from it,
/// so no state is shared between consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferPolicy {
    /// Unlimited queue: never blocks, never drops.
    Unbounded,
    /// Fixed-size queue that evicts the oldest value on overflow.
    Sliding {
        /// Maximum number of pending values (`0` is treated as `1`).
        capacity: usize,
    },
    /// Fixed-size queue; producers suspend until a slot frees (default).
    Stalling {
        /// Maximum number of pending values (`0` is treated as `1`).
        capacity: usize,
    },
    /// No storage: values reach the consumer only if it is already waiting.
    Direct,
}

impl Default for BufferPolicy {
    /// Returns `Stalling { capacity: 5 }`.
    fn default() -> Self {
        BufferPolicy::Stalling { capacity: 5 }
    }
}

impl BufferPolicy {
    /// Returns the same policy with its capacity clamped to a minimum of 1.
    #[must_use]
    pub fn clamped(self) -> Self {
        match self {
            BufferPolicy::Sliding { capacity } => BufferPolicy::Sliding {
                capacity: capacity.max(1),
            },
            BufferPolicy::Stalling { capacity } => BufferPolicy::Stalling {
                capacity: capacity.max(1),
            },
            other => other,
        }
    }

    /// Returns the bounded capacity, if any.
    ///
    /// - `None` → `Unbounded` or `Direct`
    /// - `Some(n)` → at most `n` pending values
    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        match self.clamped() {
            BufferPolicy::Sliding { capacity } | BufferPolicy::Stalling { capacity } => {
                Some(capacity)
            }
            BufferPolicy::Unbounded | BufferPolicy::Direct => None,
        }
    }

    /// True if producers may suspend under this policy.
    #[inline]
    pub fn is_blocking(&self) -> bool {
        matches!(self, BufferPolicy::Stalling { .. })
    }

    /// Instantiates a fresh, empty buffer for one subscriber.
    pub(crate) fn build<T: Send + 'static>(&self) -> Box<dyn Buffer<T>> {
        match self.clamped() {
            BufferPolicy::Unbounded => Box::new(UnboundedBuffer::new()),
            BufferPolicy::Sliding { capacity } => Box::new(SlidingBuffer::new(capacity)),
            BufferPolicy::Stalling { capacity } => Box::new(StallingBuffer::new(capacity)),
            BufferPolicy::Direct => Box::new(DirectBuffer::new()),
        }
    }

    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BufferPolicy::Unbounded => "unbounded",
            BufferPolicy::Sliding { .. } => "sliding",
            BufferPolicy::Stalling { .. } => "stalling",
            BufferPolicy::Direct => "direct",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_reports_bounded_policies_only() {
        assert_eq!(BufferPolicy::Unbounded.capacity(), None);
        assert_eq!(BufferPolicy::Direct.capacity(), None);
        assert_eq!(BufferPolicy::Sliding { capacity: 3 }.capacity(), Some(3));
        assert_eq!(BufferPolicy::Stalling { capacity: 0 }.capacity(), Some(1));
    }

    #[test]
    fn only_stalling_blocks() {
        assert!(BufferPolicy::Stalling { capacity: 1 }.is_blocking());
        assert!(!BufferPolicy::Sliding { capacity: 1 }.is_blocking());
        assert!(!BufferPolicy::Unbounded.is_blocking());
        assert!(!BufferPolicy::Direct.is_blocking());
    }

    #[test]
    fn build_yields_empty_buffers() {
        for policy in [
            BufferPolicy::Unbounded,
            BufferPolicy::Sliding { capacity: 2 },
            BufferPolicy::Stalling { capacity: 2 },
            BufferPolicy::Direct,
        ] {
            let buf = policy.build::<u32>();
            assert!(buf.is_empty(), "{} should start empty", policy.as_label());
            assert_eq!(buf.len(), 0);
        }
    }
}
