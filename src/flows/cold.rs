//! # Cold flow: one producer run per subscription.
//!
//! A [`ColdFlow`] stores a builder instead of values. Every
//! [`subscribe`](Flow::subscribe) creates a private publisher and subscriber;
//! the builder runs as its own Tokio task once the consumer first pulls.
//!
//! ## Lifecycle
//! ```text
//! subscribe() ──► Publisher (private) + Subscriber + CancellationToken
//!
//! first recv()
//!   ├─► register subscriber
//!   └─► spawn run_builder:
//!         select {
//!           builder(Emitter) ─┬─ Ok            ─► debug
//!                             ├─ Err(e)        ─► warn
//!                             └─ panic         ─► warn
//!           token.cancelled() ─► debug (subscription dropped)
//!         }
//!         publisher.close() ─► consumer drains buffer, then end-of-stream
//! ```
//!
//! ## Rules
//! - Builder failures and panics never reach the consumer as errors; they end
//!   the stream and are logged.
//! - Dropping the subscription cancels the builder task.
//! - [`Emitter::emit`] fails with [`FlowError::OwnerExited`] once the
//!   subscription is gone, so builders can stop with `?`.
//!
//! ## Example
//! ```rust
//! use flowcast::{ColdFlow, Emitter, Flow, FlowError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let letters = ColdFlow::new(|out: Emitter<&'static str>| async move {
//!     out.emit("A").await?;
//!     out.emit("B").await?;
//!     Ok::<_, FlowError>(())
//! });
//!
//! for _ in 0..2 {
//!     let mut sub = letters.subscribe();
//!     let mut seen = Vec::new();
//!     while let Some(v) = sub.next().await {
//!         seen.push(v);
//!     }
//!     assert_eq!(seen, ["A", "B"]);
//! }
//! # }
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::config::FlowConfig;
use crate::core::{Publisher, Subscriber, Subscription};
use crate::error::FlowError;
use crate::flows::flow::Flow;
use crate::policies::BufferPolicy;

type Builder<T> = Arc<dyn Fn(Emitter<T>) -> BoxFuture<'static, Result<(), FlowError>> + Send + Sync>;

/// Producer side handed to a cold-flow builder.
pub struct Emitter<T: Clone + Send + 'static> {
    publisher: Arc<Publisher<T>>,
    token: CancellationToken,
}

impl<T: Clone + Send + 'static> Emitter<T> {
    /// Sends `value` to this run's consumer, waiting for buffer space under a
    /// stalling policy.
    ///
    /// # Errors
    /// [`FlowError::OwnerExited`] once the subscription was dropped or cancelled.
    pub async fn emit(&self, value: T) -> Result<(), FlowError> {
        if self.token.is_cancelled() {
            return Err(FlowError::OwnerExited);
        }
        tokio::select! {
            _ = self.publisher.emit(value) => Ok(()),
            _ = self.token.cancelled() => Err(FlowError::OwnerExited),
        }
    }

    /// True once the subscription went away.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the subscription goes away.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl<T: Clone + Send + 'static> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            token: self.token.clone(),
        }
    }
}

/// Flow whose values are produced anew for every subscription.
pub struct ColdFlow<T: Clone + Send + 'static> {
    builder: Builder<T>,
    config: FlowConfig,
}

impl<T: Clone + Send + 'static> ColdFlow<T> {
    /// Creates a cold flow with the default configuration.
    pub fn new<F, Fut>(builder: F) -> Self
    where
        F: Fn(Emitter<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FlowError>> + Send + 'static,
    {
        Self::with_config(builder, FlowConfig::default())
    }

    /// Creates a cold flow whose subscriptions use `policy`.
    pub fn with_policy<F, Fut>(builder: F, policy: BufferPolicy) -> Self
    where
        F: Fn(Emitter<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FlowError>> + Send + 'static,
    {
        Self::with_config(builder, FlowConfig::new(policy))
    }

    /// Creates a cold flow from a full configuration.
    pub fn with_config<F, Fut>(builder: F, config: FlowConfig) -> Self
    where
        F: Fn(Emitter<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), FlowError>> + Send + 'static,
    {
        let builder: Builder<T> = Arc::new(move |emitter: Emitter<T>| builder(emitter).boxed());
        Self { builder, config }
    }

    /// Configuration this flow was built with.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }
}

impl<T: Clone + Send + 'static> Flow<T> for ColdFlow<T> {
    fn subscribe(&self) -> Subscription<T> {
        let publisher = Publisher::stateless(self.config.label.clone());
        let subscriber = Subscriber::new(
            self.config.policy_clamped().build(),
            Arc::downgrade(&publisher),
        );
        let token = CancellationToken::new();

        let emitter = Emitter {
            publisher,
            token: token.clone(),
        };
        let builder = Arc::clone(&self.builder);
        let label = self.config.label.clone();
        let launch = Box::new(move || {
            tokio::spawn(run_builder(builder, emitter, label));
        });

        Subscription::new(subscriber).with_launch(launch, token)
    }
}

impl<T: Clone + Send + 'static> Clone for ColdFlow<T> {
    fn clone(&self) -> Self {
        Self {
            builder: Arc::clone(&self.builder),
            config: self.config.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for ColdFlow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColdFlow")
            .field("label", &self.config.label)
            .field("policy", &self.config.policy)
            .finish_non_exhaustive()
    }
}

/// Runs one builder pass and closes the private publisher afterwards.
async fn run_builder<T: Clone + Send + 'static>(
    builder: Builder<T>,
    emitter: Emitter<T>,
    label: Cow<'static, str>,
) {
    let publisher = Arc::clone(&emitter.publisher);
    let token = emitter.token.clone();
    let run = AssertUnwindSafe(async move { (*builder)(emitter).await }).catch_unwind();

    let outcome = tokio::select! {
        res = run => Some(res),
        _ = token.cancelled() => None,
    };
    match outcome {
        None => tracing::debug!(flow = %label, "cold builder cancelled"),
        Some(Ok(Ok(()))) => tracing::debug!(flow = %label, "cold builder completed"),
        Some(Ok(Err(e))) if e.is_owner_exited() => {
            tracing::debug!(flow = %label, "cold builder stopped: subscription gone")
        }
        Some(Ok(Err(e))) => {
            tracing::warn!(flow = %label, error = %e, kind = e.as_label(), "cold builder failed")
        }
        Some(Err(panic)) => {
            tracing::warn!(flow = %label, panic = %panic_message(&*panic), "cold builder panicked")
        }
    }
    publisher.close();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
