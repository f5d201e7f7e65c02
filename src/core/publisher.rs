//! # Publisher: per-flow broadcast hub.
//!
//! The [`Publisher`] owns the subscriber registry, the emission queue and, for
//! state flows, the current value. Every flow variant fans out through one.
//!
//! ## Architecture
//! ```text
//! emit(v) ──► pending queue (seq) ──► in_flight? ── yes ──► wait for delivered >= seq
//!                                          │
//!                                          └── no ───► become drainer:
//!                                                        loop {
//!                                                          pop (seq, v)
//!                                                          current = v          (state flows)
//!                                                          snapshot registry    (prune dead Weak)
//!                                                          for sub: sub.send(v).await
//!                                                          delivered = seq; notify
//!                                                        }
//! ```
//!
//! ## Rules
//! - **Linearized emission**: one drainer at a time; values leave the queue in
//!   enqueue order, so every subscriber sees emission order.
//! - **Backpressure for every emitter**: `emit` returns only once its own value
//!   was fanned out, even when another task did the draining.
//! - **Weak registry**: tracking a subscriber never keeps it alive; dead entries
//!   are pruned at the next fan-out or by [`Publisher::cancel`].
//! - **Current value at dequeue**: the stored value changes right before the
//!   registry snapshot, under the same lock. A subscriber registering during a
//!   fan-out is seeded with the new value and is not part of that fan-out.
//! - **Cancellation**: if a drainer's future is dropped mid-drain while values
//!   are still queued, a continuation drain is spawned; otherwise the
//!   in-flight flag is released. The value being fanned out at that moment may
//!   reach only part of the subscribers.
//! - **Cancel before first pull**: subscriptions are tracked from
//!   `subscribe()`, so [`Publisher::cancel`] also ends one that never pulled.
//! - **Close on drop**: when the publisher closes (or is dropped) every live
//!   subscriber is closed and observes end-of-stream after its buffer.

use std::borrow::Cow;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::core::subscriber::{Subscriber, SubscriberId};

/// Result of [`Publisher::register`].
pub(crate) enum Registration<T> {
    /// Registered; state flows hand out the current value as seed.
    Live { seed: Option<T> },
    /// The publisher was closed; the subscriber should end immediately.
    Closed,
}

struct HubState<T> {
    registry: BTreeMap<SubscriberId, Weak<Subscriber<T>>>,
    /// Handed out by `subscribe()` but not registered yet.
    unregistered: BTreeMap<SubscriberId, Weak<Subscriber<T>>>,
    pending: VecDeque<(u64, T)>,
    next_seq: u64,
    /// Highest sequence number whose fan-out has finished.
    delivered: u64,
    in_flight: bool,
    current: Option<T>,
    closed: bool,
}

impl<T: Clone + Send + 'static> HubState<T> {
    /// Upgrades live entries and drops dead ones.
    fn live_targets(&mut self, label: &str) -> Vec<Arc<Subscriber<T>>> {
        let before = self.registry.len();
        let mut live = Vec::with_capacity(before);
        self.registry.retain(|_, weak| match weak.upgrade() {
            Some(sub) => {
                live.push(sub);
                true
            }
            None => false,
        });

        self.unregistered.retain(|_, weak| weak.strong_count() > 0);

        let pruned = before - self.registry.len();
        if pruned > 0 {
            tracing::debug!(flow = label, pruned, live = live.len(), "pruned dead subscribers");
        }
        live
    }
}

/// Per-flow broadcast hub.
pub struct Publisher<T> {
    label: Cow<'static, str>,
    retains_latest: bool,
    state: Mutex<HubState<T>>,
    progress: Notify,
}

impl<T: Clone + Send + 'static> Publisher<T> {
    fn with_slot(label: impl Into<Cow<'static, str>>, current: Option<T>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            retains_latest: current.is_some(),
            state: Mutex::new(HubState {
                registry: BTreeMap::new(),
                unregistered: BTreeMap::new(),
                pending: VecDeque::new(),
                next_seq: 1,
                delivered: 0,
                in_flight: false,
                current,
                closed: false,
            }),
            progress: Notify::new(),
        })
    }

    /// Creates a hub without a current value (shared and cold flows).
    pub fn stateless(label: impl Into<Cow<'static, str>>) -> Arc<Self> {
        Self::with_slot(label, None)
    }

    /// Creates a hub holding `initial` as its current value (state flows).
    pub fn stateful(initial: T, label: impl Into<Cow<'static, str>>) -> Arc<Self> {
        Self::with_slot(label, Some(initial))
    }

    /// Log label of the owning flow.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current value (state flows only).
    pub fn current(&self) -> Option<T> {
        self.state.lock().current.clone()
    }

    /// Number of registered subscribers that are still alive.
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .registry
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// True once [`Publisher::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Remembers a subscriber that was handed out but has not pulled yet, so
    /// [`Publisher::cancel`] can reach it.
    pub(crate) fn track(&self, sub: &Arc<Subscriber<T>>) {
        let mut st = self.state.lock();
        if !st.closed {
            st.unregistered.insert(sub.id(), Arc::downgrade(sub));
        }
    }

    /// Adds `sub` to the registry.
    ///
    /// State flows seed the newcomer with the current value; stateless hubs
    /// hand out no seed.
    pub(crate) fn register(&self, sub: &Arc<Subscriber<T>>) -> Registration<T> {
        let mut st = self.state.lock();
        st.unregistered.remove(&sub.id());
        if st.closed {
            return Registration::Closed;
        }
        st.registry.insert(sub.id(), Arc::downgrade(sub));
        let seed = if self.retains_latest {
            st.current.clone()
        } else {
            None
        };
        drop(st);

        tracing::debug!(flow = %self.label, subscriber = %sub.id(), seeded = seed.is_some(), "subscriber registered");
        Registration::Live { seed }
    }

    /// Broadcasts `value` to every live subscriber.
    ///
    /// Suspends until this value has been handed to all subscribers (which may
    /// take a while under a stalling policy). Concurrent callers are
    /// linearized; values emitted after [`Publisher::close`] are discarded.
    pub async fn emit(self: &Arc<Self>, value: T) {
        let Some(seq) = self.enqueue(value) else {
            return;
        };

        loop {
            let notified = self.progress.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let become_drainer = {
                let mut st = self.state.lock();
                if st.delivered >= seq {
                    return;
                }
                if st.in_flight {
                    false
                } else {
                    st.in_flight = true;
                    true
                }
            };

            if become_drainer {
                self.drain().await;
                continue;
            }
            notified.await;
        }
    }

    /// Queues `value` and returns immediately.
    ///
    /// Values keep their call order relative to other emissions. If no drain is
    /// running, one is spawned on the current Tokio runtime.
    ///
    /// # Panics
    /// When called outside a Tokio runtime while no drain is in flight.
    pub fn emit_detached(self: &Arc<Self>, value: T) {
        if self.enqueue(value).is_none() {
            return;
        }
        let start = {
            let mut st = self.state.lock();
            if st.in_flight {
                false
            } else {
                st.in_flight = true;
                true
            }
        };
        if start {
            let me = Arc::clone(self);
            tokio::spawn(async move { me.drain().await });
        }
    }

    /// Removes `id` from the registry and force-closes it.
    ///
    /// Also reaches subscriptions that were handed out but never pulled.
    /// Returns `false` if the id was unknown or its subscriber already dropped.
    pub fn cancel(&self, id: SubscriberId) -> bool {
        let entry = {
            let mut st = self.state.lock();
            match st.registry.remove(&id) {
                Some(weak) => Some(weak),
                None => st.unregistered.remove(&id),
            }
        };
        match entry.and_then(|w| w.upgrade()) {
            Some(sub) => {
                sub.cancel();
                tracing::debug!(flow = %self.label, subscriber = %id, "subscriber cancelled");
                true
            }
            None => false,
        }
    }

    /// Stops accepting emissions and closes every registered subscriber.
    ///
    /// Subscribers drain what they already buffered, then see end-of-stream.
    /// Idempotent.
    pub fn close(&self) {
        let registry = {
            let mut st = self.state.lock();
            if st.closed {
                return;
            }
            st.closed = true;
            st.unregistered.clear();
            std::mem::take(&mut st.registry)
        };
        close_all(&self.label, registry);
    }

    fn enqueue(&self, value: T) -> Option<u64> {
        let mut st = self.state.lock();
        if st.closed {
            tracing::trace!(flow = %self.label, "value dropped: publisher closed");
            return None;
        }
        let seq = st.next_seq;
        st.next_seq += 1;
        st.pending.push_back((seq, value));
        Some(seq)
    }

    /// Fans out queued values until the queue is empty.
    ///
    /// The caller must have set `in_flight`.
    async fn drain(self: &Arc<Self>) {
        let mut guard = DrainGuard {
            publisher: self,
            fanning_out: 0,
            armed: true,
        };

        loop {
            let (seq, value, targets) = {
                let mut st = self.state.lock();
                let Some((seq, value)) = st.pending.pop_front() else {
                    st.in_flight = false;
                    guard.armed = false;
                    break;
                };
                guard.fanning_out = seq;
                if self.retains_latest {
                    st.current = Some(value.clone());
                }
                let targets = st.live_targets(&self.label);
                (seq, value, targets)
            };

            for sub in &targets {
                sub.send(value.clone()).await;
            }
            drop(targets);

            self.state.lock().delivered = seq;
            self.progress.notify_waiters();
        }
        self.progress.notify_waiters();
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("label", &self.label)
            .field("retains_latest", &self.retains_latest)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        let st = self.state.get_mut();
        if st.closed {
            return;
        }
        st.closed = true;
        st.unregistered.clear();
        let registry = std::mem::take(&mut st.registry);
        close_all(&self.label, registry);
    }
}

fn close_all<T>(label: &str, registry: BTreeMap<SubscriberId, Weak<Subscriber<T>>>) {
    let mut closed = 0usize;
    for weak in registry.values() {
        if let Some(sub) = weak.upgrade() {
            sub.close();
            closed += 1;
        }
    }
    tracing::debug!(flow = label, closed, "publisher closed");
}

/// Hands an abandoned drain over to a spawned continuation, or releases the
/// in-flight flag when nothing is queued.
struct DrainGuard<'a, T: Clone + Send + 'static> {
    publisher: &'a Arc<Publisher<T>>,
    /// Sequence number of the value being fanned out (`0` before the first pop).
    fanning_out: u64,
    armed: bool,
}

impl<T: Clone + Send + 'static> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let publisher = self.publisher;
        let continue_on = {
            let mut st = publisher.state.lock();
            // The abandoned value counts as delivered so its emitter stops waiting.
            st.delivered = st.delivered.max(self.fanning_out);
            let handle = if st.pending.is_empty() {
                None
            } else {
                tokio::runtime::Handle::try_current().ok()
            };
            if handle.is_none() {
                st.in_flight = false;
            }
            handle
        };

        if let Some(handle) = continue_on {
            tracing::debug!(flow = %publisher.label, "drainer dropped; continuing in background");
            let me = Arc::clone(publisher);
            handle.spawn(async move { me.drain().await });
        }
        publisher.progress.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::policies::BufferPolicy;

    fn attach(p: &Arc<Publisher<u32>>, policy: BufferPolicy) -> Arc<Subscriber<u32>> {
        let sub = Subscriber::new(policy.build(), Arc::downgrade(p));
        sub.ensure_registered();
        sub
    }

    #[tokio::test]
    async fn emit_without_subscribers_returns() {
        let p = Publisher::<u32>::stateless("test");
        p.emit(1).await;
        assert_eq!(p.subscriber_count(), 0);
        assert_eq!(p.current(), None);
    }

    #[tokio::test]
    async fn fans_out_in_emission_order() {
        let p = Publisher::stateless("test");
        let a = attach(&p, BufferPolicy::Unbounded);
        let b = attach(&p, BufferPolicy::Unbounded);
        assert_eq!(p.subscriber_count(), 2);

        for v in 1..=3 {
            p.emit(v).await;
        }
        for sub in [&a, &b] {
            assert_eq!(sub.next().await, Ok(Some(1)));
            assert_eq!(sub.next().await, Ok(Some(2)));
            assert_eq!(sub.next().await, Ok(Some(3)));
        }
    }

    #[tokio::test]
    async fn stateful_hub_seeds_newcomers() {
        let p = Publisher::stateful(1, "test");
        p.emit(2).await;
        assert_eq!(p.current(), Some(2));

        let sub = attach(&p, BufferPolicy::Direct);
        assert_eq!(sub.next().await, Ok(Some(2)));
    }

    #[tokio::test]
    async fn cancel_is_reported_once() {
        let p = Publisher::stateless("test");
        let sub = attach(&p, BufferPolicy::Unbounded);
        assert!(p.cancel(sub.id()));
        assert!(!p.cancel(sub.id()));
        assert!(sub.is_closed());
        assert_eq!(p.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dead_subscribers_are_pruned() {
        let p = Publisher::stateless("test");
        let sub = attach(&p, BufferPolicy::Unbounded);
        drop(sub);
        assert_eq!(p.subscriber_count(), 0);
        p.emit(1).await;
        assert!(p.state.lock().registry.is_empty());
    }

    #[tokio::test]
    async fn close_ends_subscribers_and_discards_emissions() {
        let p = Publisher::stateless("test");
        let sub = attach(&p, BufferPolicy::Unbounded);
        p.emit(1).await;
        p.close();
        p.emit(2).await;
        assert!(p.is_closed());
        assert_eq!(sub.next().await, Ok(Some(1)));
        assert_eq!(sub.next().await, Ok(None));

        let late = Subscriber::new(BufferPolicy::Unbounded.build(), Arc::downgrade(&p));
        assert_eq!(late.next().await, Ok(None));
    }

    #[tokio::test]
    async fn drop_closes_subscribers() {
        let p = Publisher::stateless("test");
        let sub = attach(&p, BufferPolicy::Unbounded);
        p.emit(5).await;
        drop(p);
        assert_eq!(sub.next().await, Ok(Some(5)));
        assert_eq!(sub.next().await, Ok(None));
    }

    #[tokio::test]
    async fn abandoned_drain_releases_in_flight() {
        let p = Publisher::stateless("test");
        let sub = attach(&p, BufferPolicy::Stalling { capacity: 1 });
        p.emit(1).await;

        let stalled = tokio::time::timeout(Duration::from_millis(20), p.emit(2)).await;
        assert!(stalled.is_err());
        assert!(!p.state.lock().in_flight);

        assert_eq!(sub.next().await, Ok(Some(1)));
        p.emit(3).await;
        assert_eq!(sub.next().await, Ok(Some(3)));
    }

    #[tokio::test]
    async fn queued_values_survive_an_abandoned_drainer() {
        let p = Publisher::stateful(0, "test");
        let sub = attach(&p, BufferPolicy::Stalling { capacity: 1 });
        assert_eq!(sub.next().await, Ok(Some(0)));
        p.emit(1).await;

        let mut stalled = Box::pin(p.emit(2));
        assert!(futures::poll!(stalled.as_mut()).is_pending());
        p.emit_detached(3);
        drop(stalled);

        assert_eq!(sub.next().await, Ok(Some(1)));
        let next = tokio::time::timeout(Duration::from_secs(1), sub.next()).await;
        assert_eq!(next, Ok(Ok(Some(3))));
        assert_eq!(p.current(), Some(3));
    }

    #[tokio::test]
    async fn waiting_emitter_returns_when_its_value_is_abandoned() {
        let p = Publisher::stateless("test");
        let sub = attach(&p, BufferPolicy::Stalling { capacity: 1 });
        p.emit(1).await;

        let mut first = Box::pin(p.emit(2));
        assert!(futures::poll!(first.as_mut()).is_pending());
        let second = {
            let p = Arc::clone(&p);
            tokio::spawn(async move { p.emit(3).await })
        };
        tokio::task::yield_now().await;
        drop(first);

        assert_eq!(sub.next().await, Ok(Some(1)));
        assert_eq!(sub.next().await, Ok(Some(3)));
        tokio::time::timeout(Duration::from_secs(1), second)
            .await
            .expect("emitter released")
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_reaches_subscriber_that_never_pulled() {
        let p = Publisher::stateless("test");
        let sub = Subscriber::new(BufferPolicy::Unbounded.build(), Arc::downgrade(&p));
        p.track(&sub);

        assert!(p.cancel(sub.id()));
        assert!(!p.cancel(sub.id()));
        p.emit(7).await;
        assert_eq!(sub.next().await, Ok(None));
        assert_eq!(p.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn detached_emissions_keep_order() {
        let p = Publisher::stateless("test");
        let sub = attach(&p, BufferPolicy::Unbounded);
        for v in 1..=4 {
            p.emit_detached(v);
        }
        for v in 1..=4 {
            assert_eq!(sub.next().await, Ok(Some(v)));
        }
    }
}
