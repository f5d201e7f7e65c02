//! # State flow: hot latest-value holder.
//!
//! [`MutableStateFlow`] always has a current value. Every subscription starts
//! with the value current at its registration, then sees later emissions in
//! order. Consumers slower than the producer may skip intermediate values when
//! their policy drops (sliding, direct), but never observe one twice.
//!
//! ## Rules
//! - `value()` reflects the latest value taken off the emission queue, which
//!   may be ahead of what slow subscribers have received.
//! - A subscription registering while a value is being fanned out is seeded
//!   with that value and skipped by the running fan-out.
//!
//! ## Example
//! ```rust
//! use flowcast::{Flow, MutableStateFlow};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let state = MutableStateFlow::new(0u32);
//! state.emit(1).await;
//! state.emit(2).await;
//! assert_eq!(state.value(), 2);
//!
//! let mut sub = state.subscribe();
//! assert_eq!(sub.next().await, Some(2));
//! # }
//! ```

use std::sync::Arc;

use crate::config::FlowConfig;
use crate::core::{Publisher, SubscriberId, Subscription};
use crate::flows::flow::{Flow, attach};
use crate::policies::BufferPolicy;

/// Writable handle of a latest-value hot flow.
pub struct MutableStateFlow<T: Clone + Send + 'static> {
    publisher: Arc<Publisher<T>>,
    config: FlowConfig,
}

impl<T: Clone + Send + 'static> MutableStateFlow<T> {
    /// Creates a flow holding `initial`, with the default configuration.
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, FlowConfig::default())
    }

    /// Creates a flow holding `initial` whose subscribers use `policy`.
    pub fn with_policy(initial: T, policy: BufferPolicy) -> Self {
        Self::with_config(initial, FlowConfig::new(policy))
    }

    /// Creates a flow holding `initial` from a full configuration.
    pub fn with_config(initial: T, config: FlowConfig) -> Self {
        Self {
            publisher: Publisher::stateful(initial, config.label.clone()),
            config,
        }
    }

    /// Current value.
    pub fn value(&self) -> T {
        current_of(&self.publisher)
    }

    /// Replaces the current value and waits until every registered subscriber
    /// took it.
    pub async fn emit(&self, value: T) {
        self.publisher.emit(value).await;
    }

    /// Queues `value` without waiting; [`MutableStateFlow::value`] changes once
    /// the queue reaches it.
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
    pub fn cancel(&self, id: SubscriberId) -> bool {
        self.publisher.cancel(id)
    }

    /// Read-only projection sharing the same publisher.
    pub fn as_state_flow(&self) -> StateFlow<T> {
        StateFlow {
            publisher: Arc::clone(&self.publisher),
            config: self.config.clone(),
        }
    }

    /// Configuration this flow was built with.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }
}

impl<T: Clone + Send + 'static> Flow<T> for MutableStateFlow<T> {
    fn subscribe(&self) -> Subscription<T> {
        attach(&self.publisher, self.config.policy_clamped())
    }
}

impl<T: Clone + Send + 'static> Clone for MutableStateFlow<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            config: self.config.clone(),
        }
    }
}

impl<T: Clone + Send + std::fmt::Debug + 'static> std::fmt::Debug for MutableStateFlow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableStateFlow")
            .field("label", &self.config.label)
            .field("value", &self.value())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Read-only view of a [`MutableStateFlow`].
pub struct StateFlow<T: Clone + Send + 'static> {
    publisher: Arc<Publisher<T>>,
    config: FlowConfig,
}

impl<T: Clone + Send + 'static> StateFlow<T> {
    /// Current value.
    pub fn value(&self) -> T {
        current_of(&self.publisher)
    }

    /// Number of registered, still alive subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.publisher.subscriber_count()
    }
}

impl<T: Clone + Send + 'static> Flow<T> for StateFlow<T> {
    fn subscribe(&self) -> Subscription<T> {
        attach(&self.publisher, self.config.policy_clamped())
    }
}

impl<T: Clone + Send + 'static> Clone for StateFlow<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            config: self.config.clone(),
        }
    }
}

fn current_of<T: Clone + Send + 'static>(publisher: &Publisher<T>) -> T {
    match publisher.current() {
        Some(v) => v,
        None => unreachable!("flowcast: state flow `{}` lost its value", publisher.label()),
    }
}
