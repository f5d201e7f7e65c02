//! # One-shot parked waiter.
//!
//! A consumer that finds its buffer empty parks a [`Waiter`] in its
//! subscriber and suspends on the matching receiver. Whoever resolves the
//! waiter (a `send`, `close` or `cancel`) does so **exactly once**.
//!
//! ```text
//! Subscriber::next ── Waiter::park() ──► (waiter stored in subscriber, rx awaited)
//!                                               │
//! send / close / cancel ── waiter.resolve(d) ───┘  (second resolve → panic)
//! ```

use tokio::sync::oneshot;

use crate::error::FlowError;

/// Outcome handed to a parked consumer: a value, end-of-stream (`Ok(None)`)
/// or the owner-exited error.
pub(crate) type Delivery<T> = Result<Option<T>, FlowError>;

/// Resolvable half of a parked wait.
pub(crate) struct Waiter<T> {
    tx: Option<oneshot::Sender<Delivery<T>>>,
}

impl<T> Waiter<T> {
    /// Creates a waiter and the receiver the consumer suspends on.
    pub(crate) fn park() -> (Self, oneshot::Receiver<Delivery<T>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// True if the consumer stopped waiting (its receiver was dropped or closed).
    pub(crate) fn is_abandoned(&self) -> bool {
        self.tx.as_ref().is_none_or(|tx| tx.is_closed())
    }

    /// Resolves the wait.
    ///
    /// Returns the delivery back if the consumer is gone so the caller can
    /// keep the value.
    ///
    /// # Panics
    /// Resolving the same waiter twice is a contract violation.
    pub(crate) fn resolve(&mut self, delivery: Delivery<T>) -> Result<(), Delivery<T>> {
        match self.tx.take() {
            Some(tx) => tx.send(delivery),
            None => panic!("flowcast: parked waiter resolved twice"),
        }
    }
}
