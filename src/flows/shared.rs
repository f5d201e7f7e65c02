//! # Shared flow: stateless hot broadcast.
//!
//! [`MutableSharedFlow`] owns one publisher for its whole life. A value
//! reaches exactly the subscriptions registered when it is fanned out; there is
//! no replay for latecomers.
//!
//! ## Rules
//! - A subscription registers on its first receive, not at `subscribe()`.
//! - `emit` waits until every registered subscriber took the value (see
//!   [`BufferPolicy::Stalling`]).
//! - Clones share the publisher; when the last clone (and every
//!   [`SharedFlow`] projection) is dropped, subscribers see end-of-stream.
//!
//! ## Example
//! ```rust
//! use flowcast::{BufferPolicy, Flow, MutableSharedFlow};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let flow = MutableSharedFlow::with_policy(BufferPolicy::Unbounded);
//! let mut sub = flow.subscribe();
//!
//! let producer = {
//!     let flow = flow.clone();
//!     tokio::spawn(async move {
//!         while flow.subscription_count() == 0 {
//!             tokio::task::yield_now().await;
//!         }
//!         flow.emit("ping").await;
//!     })
//! };
//!
//! assert_eq!(sub.next().await, Some("ping"));
//! producer.await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use crate::config::FlowConfig;
use crate::core::{Publisher, SubscriberId, Subscription};
use crate::flows::flow::{Flow, attach};
use crate::policies::BufferPolicy;

/// Writable handle of a stateless hot flow.
pub struct MutableSharedFlow<T: Clone + Send + 'static> {
    publisher: Arc<Publisher<T>>,
    config: FlowConfig,
}

impl<T: Clone + Send + 'static> MutableSharedFlow<T> {
    /// Creates a flow with the default configuration.
    pub fn new() -> Self {
        Self::with_config(FlowConfig::default())
    }

    /// Creates a flow whose subscribers use `policy`.
    pub fn with_policy(policy: BufferPolicy) -> Self {
        Self::with_config(FlowConfig::new(policy))
    }

    /// Creates a flow from a full configuration.
    pub fn with_config(config: FlowConfig) -> Self {
        Self {
            publisher: Publisher::stateless(config.label.clone()),
            config,
        }
    }

    /// Broadcasts `value` and waits until every registered subscriber took it.
    pub async fn emit(&self, value: T) {
        self.publisher.emit(value).await;
    }

    /// Queues `value` for broadcast without waiting.
    ///
    /// # Panics
    /// Outside a Tokio runtime.
    pub fn emit_detached(&self, value: T) {
        self.publisher.emit_detached(value);
    }

    /// Number of registered, still alive subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.publisher.subscriber_count()
    }

    /// Unsubscribes `id`; a consumer waiting on it gets
    /// [`FlowError::OwnerExited`](crate::FlowError::OwnerExited).
    ///
    /// Returns `false` if `id` is not registered here.
    pub fn cancel(&self, id: SubscriberId) -> bool {
        self.publisher.cancel(id)
    }

    /// Read-only projection sharing the same publisher.
    pub fn as_shared_flow(&self) -> SharedFlow<T> {
        SharedFlow {
            publisher: Arc::clone(&self.publisher),
            config: self.config.clone(),
        }
    }

    /// Configuration this flow was built with.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }
}

impl<T: Clone + Send + 'static> Flow<T> for MutableSharedFlow<T> {
    fn subscribe(&self) -> Subscription<T> {
        attach(&self.publisher, self.config.policy_clamped())
    }
}

impl<T: Clone + Send + 'static> Clone for MutableSharedFlow<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            config: self.config.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for MutableSharedFlow<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for MutableSharedFlow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableSharedFlow")
            .field("label", &self.config.label)
            .field("policy", &self.config.policy)
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Read-only view of a [`MutableSharedFlow`].
pub struct SharedFlow<T: Clone + Send + 'static> {
    publisher: Arc<Publisher<T>>,
    config: FlowConfig,
}

impl<T: Clone + Send + 'static> SharedFlow<T> {
    /// Number of registered, still alive subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.publisher.subscriber_count()
    }
}

impl<T: Clone + Send + 'static> Flow<T> for SharedFlow<T> {
    fn subscribe(&self) -> Subscription<T> {
        attach(&self.publisher, self.config.policy_clamped())
    }
}

impl<T: Clone + Send + 'static> Clone for SharedFlow<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscribers_miss_earlier_values() {
        let flow = MutableSharedFlow::with_policy(BufferPolicy::Unbounded);
        let mut early = flow.subscribe();
        flow.emit(0).await;

        let waiting = tokio::spawn(async move {
            let v = early.next().await;
            (v, early)
        });
        while flow.subscription_count() == 0 {
            tokio::task::yield_now().await;
        }
        flow.emit(1).await;
        let (v, _early) = waiting.await.unwrap();
        assert_eq!(v, Some(1));
    }

    #[tokio::test]
    async fn projection_sees_same_values() {
        let flow = MutableSharedFlow::with_policy(BufferPolicy::Unbounded);
        let view = flow.as_shared_flow();
        let mut sub = view.subscribe();

        let consumer = tokio::spawn(async move { sub.next().await });
        while view.subscription_count() == 0 {
            tokio::task::yield_now().await;
        }
        flow.emit("x").await;
        assert_eq!(consumer.await.unwrap(), Some("x"));
    }

    #[tokio::test]
    async fn dropping_every_handle_ends_subscriptions() {
        let flow = MutableSharedFlow::<u8>::with_policy(BufferPolicy::Unbounded);
        let mut sub = flow.subscribe();
        let consumer = tokio::spawn(async move { sub.recv().await });
        while flow.subscription_count() == 0 {
            tokio::task::yield_now().await;
        }
        drop(flow);
        assert_eq!(consumer.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn cancel_before_first_receive_ends_subscription() {
        let flow = MutableSharedFlow::with_policy(BufferPolicy::Unbounded);
        let mut sub = flow.subscribe();
        assert!(flow.cancel(sub.id()));
        assert!(!flow.cancel(sub.id()));

        flow.emit(1).await;
        assert_eq!(sub.recv().await, Ok(None));
        assert_eq!(flow.subscription_count(), 0);
    }

    #[test]
    fn default_config_is_stalling() {
        let flow = MutableSharedFlow::<u8>::default();
        assert_eq!(flow.config().policy, BufferPolicy::Stalling { capacity: 5 });
        assert_eq!(flow.subscription_count(), 0);
    }
}
