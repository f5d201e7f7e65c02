//! # Subscriber: single-consumer endpoint of a publisher.
//!
//! A [`Subscriber`] owns one [`Buffer`] and at most one parked [`Waiter`].
//! The publisher only holds a weak reference to it; the consumer-side
//! [`Subscription`](crate::Subscription) holds the only strong one.
//!
//! ## Architecture
//! ```text
//! Publisher drain ── send(v) ──► ┌──────────── Subscriber ────────────┐
//!                                │ state (Mutex):                     │
//!                                │   waiter? ── yes ──► resolve(v)    │
//!                                │      └──── no ───► Buffer::add(v)  │──► pump()
//!                                └────────────────────────────────────┘
//! Subscription::recv ── next() ──► register once ─► Buffer::next() ─► value / Close
//!                                                        └─ empty ─► park Waiter, await
//! ```
//!
//! ## Rules
//! - **One waiter**: a second live wait on the same subscriber panics.
//! - **No lost wake-up**: "buffer empty → park" (consumer) and
//!   "waiter present? → hand off" (producer) run under the same lock; after a
//!   buffered `add`, [`Subscriber::pump`] re-checks for a waiter that parked
//!   meanwhile.
//! - **Cancel-safe wait**: if the consumer's `next()` future is dropped after a
//!   value was handed to it, the value is reclaimed and returned by the next call.
//! - **Lock order**: subscriber → publisher (registration only). No lock is
//!   held across an `.await`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::buffer::{Buffer, Message};
use crate::core::publisher::{Publisher, Registration};
use crate::core::waiter::{Delivery, Waiter};
use crate::error::FlowError;
use crate::policies::BufferPolicy;

/// Global counter for subscriber ids.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique subscriber identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct State<T> {
    waiter: Option<Waiter<T>>,
    /// Value handed to a consumer whose wait was dropped before reading it.
    reclaimed: Option<T>,
    registered: bool,
    /// No more values are admitted.
    closed: bool,
    /// End-of-stream (or cancellation) was handed out.
    finished: bool,
}

/// Single-consumer unit owning one buffer and at most one parked wait.
pub struct Subscriber<T> {
    id: SubscriberId,
    buffer: Box<dyn Buffer<T>>,
    source: Weak<Publisher<T>>,
    state: Mutex<State<T>>,
}

impl<T: Clone + Send + 'static> Subscriber<T> {
    /// Creates an unregistered subscriber for `source`.
    ///
    /// Registration happens on the first [`Subscriber::next`] (or
    /// [`Subscriber::ensure_registered`]).
    pub(crate) fn new(buffer: Box<dyn Buffer<T>>, source: Weak<Publisher<T>>) -> Arc<Self> {
        Arc::new(Self {
            id: SubscriberId::next(),
            buffer,
            source,
            state: Mutex::new(State {
                waiter: None,
                reclaimed: None,
                registered: false,
                closed: false,
                finished: false,
            }),
        })
    }

    /// Registers with the publisher if not done yet (idempotent).
    pub(crate) fn ensure_registered(self: &Arc<Self>) {
        let keepalive = self.upgrade_if_unregistered();
        let mut st = self.state.lock();
        self.register_locked(&mut st, keepalive.as_ref());
        drop(st);
        drop(keepalive);
    }

    /// Delivers `value` to a parked consumer, or buffers it per policy.
    ///
    /// May suspend under [`BufferPolicy::Stalling`] until the consumer frees a
    /// slot or the subscriber is closed. Values sent after close are discarded.
    pub async fn send(&self, value: T) {
        let value = {
            let mut st = self.state.lock();
            if st.closed {
                tracing::trace!(subscriber = %self.id, "value dropped: subscriber closed");
                return;
            }
            match st.waiter.take() {
                Some(mut waiter) => match waiter.resolve(Ok(Some(value))) {
                    Ok(()) => return,
                    Err(Ok(Some(value))) => value,
                    Err(_) => return,
                },
                None => value,
            }
        };

        self.buffer.add(value).await;
        self.pump();
    }

    /// Pulls the next value.
    ///
    /// - `Ok(Some(v))`: next value in emission order;
    /// - `Ok(None)`: end-of-stream (and every call after it);
    /// - `Err(FlowError::OwnerExited)`: the wait was abandoned by [`Subscriber::cancel`].
    ///
    /// # Panics
    /// If another call to `next` on the same subscriber is still waiting.
    pub async fn next(self: &Arc<Self>) -> Delivery<T> {
        let keepalive = self.upgrade_if_unregistered();
        let rx = {
            let mut st = self.state.lock();
            self.register_locked(&mut st, keepalive.as_ref());

            if let Some(v) = st.reclaimed.take() {
                return Ok(Some(v));
            }
            if st.finished {
                return Ok(None);
            }
            if let Some(msg) = self.buffer.next() {
                return Self::settle(&mut st, msg);
            }
            if st.waiter.as_ref().is_some_and(|w| !w.is_abandoned()) {
                panic!(
                    "flowcast: concurrent next() on subscriber {}; calls must be serialized",
                    self.id
                );
            }
            let (waiter, rx) = Waiter::park();
            st.waiter = Some(waiter);
            rx
        };
        drop(keepalive);

        Parked {
            rx,
            owner: self.as_ref(),
            settled: false,
        }
        .wait()
        .await
    }

    /// Removes this subscriber from its publisher and force-closes it.
    pub(crate) fn detach(&self) {
        let removed = match self.source.upgrade() {
            Some(publisher) => publisher.cancel(self.id),
            None => false,
        };
        if !removed {
            self.cancel();
        }
    }

    /// Hands the oldest pending message to a waiter that parked meanwhile.
    fn pump(&self) {
        let mut st = self.state.lock();
        self.pump_locked(&mut st);
    }

    fn reclaim(&self, value: T) {
        let mut st = self.state.lock();
        st.reclaimed = Some(value);
    }

    fn upgrade_if_unregistered(&self) -> Option<Arc<Publisher<T>>> {
        if self.state.lock().registered {
            None
        } else {
            self.source.upgrade()
        }
    }

    /// Registers with `publisher` on first use.
    ///
    /// `publisher` must be upgraded before `st` is locked and dropped after it
    /// is released: dropping the last publisher reference closes subscribers.
    fn register_locked(self: &Arc<Self>, st: &mut State<T>, publisher: Option<&Arc<Publisher<T>>>) {
        if st.registered {
            return;
        }
        st.registered = true;
        if st.closed {
            return;
        }

        match publisher.map(|p| p.register(self)) {
            Some(Registration::Live { seed }) => {
                if let Some(seed) = seed {
                    self.buffer.seed(seed);
                }
            }
            Some(Registration::Closed) | None => {
                tracing::debug!(subscriber = %self.id, "publisher gone before registration");
                st.closed = true;
                self.buffer.close();
            }
        }
    }
}

impl<T> Subscriber<T> {
    /// Unique id of this subscriber.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Policy of the owned buffer.
    pub fn policy(&self) -> BufferPolicy {
        self.buffer.policy()
    }

    /// Number of values waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// True once the subscriber stopped admitting values.
    pub fn is_closed(&self) -> bool {
        self.buffer.is_closed()
    }

    /// Ends the stream gracefully.
    ///
    /// A parked consumer observes end-of-stream immediately; otherwise buffered
    /// values are drained first.
    pub fn close(&self) {
        let mut st = self.state.lock();
        if st.closed {
            return;
        }
        st.closed = true;
        self.buffer.close();
        self.pump_locked(&mut st);
    }

    /// Force-closes the subscriber.
    ///
    /// A parked consumer is resumed with [`FlowError::OwnerExited`]; otherwise
    /// behaves like [`Subscriber::close`]. Releases a producer stalled on this
    /// subscriber's buffer.
    pub fn cancel(&self) {
        let mut st = self.state.lock();
        if !st.closed {
            st.closed = true;
            self.buffer.close();
        }
        if let Some(mut waiter) = st.waiter.take() {
            if !waiter.is_abandoned() {
                st.finished = true;
                let _ = waiter.resolve(Err(FlowError::OwnerExited));
            }
        }
    }

    fn pump_locked(&self, st: &mut State<T>) {
        let abandoned = match st.waiter.as_ref() {
            Some(w) => w.is_abandoned(),
            None => return,
        };
        if abandoned {
            st.waiter = None;
            return;
        }
        let Some(msg) = self.buffer.next() else {
            return;
        };
        let delivery = Self::settle(st, msg);
        if let Some(mut waiter) = st.waiter.take() {
            if let Err(Ok(Some(v))) = waiter.resolve(delivery) {
                st.reclaimed = Some(v);
            }
        }
    }

    fn settle(st: &mut State<T>, msg: Message<T>) -> Delivery<T> {
        match msg {
            Message::Element(v) => Ok(Some(v)),
            Message::Close => {
                st.finished = true;
                Ok(None)
            }
        }
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("policy", &self.policy())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Pending wait that gives an undelivered value back if dropped mid-flight.
struct Parked<'a, T: Clone + Send + 'static> {
    rx: oneshot::Receiver<Delivery<T>>,
    owner: &'a Subscriber<T>,
    settled: bool,
}

impl<T: Clone + Send + 'static> Parked<'_, T> {
    async fn wait(mut self) -> Delivery<T> {
        let res = (&mut self.rx).await;
        self.settled = true;
        match res {
            Ok(delivery) => delivery,
            Err(_) => Err(FlowError::OwnerExited),
        }
    }
}

impl<T: Clone + Send + 'static> Drop for Parked<'_, T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.rx.close();
        if let Ok(Ok(Some(v))) = self.rx.try_recv() {
            self.owner.reclaim(v);
        }
    }
}
