//! # Subscription: consumer handle returned by `Flow::subscribe`.
//!
//! Holds the only strong reference to its [`Subscriber`]. Dropping the
//! handle detaches it: the publisher forgets it and a producer stalled on its
//! buffer is released.
//!
//! For cold flows the handle also carries the deferred builder launch, which
//! fires on the first [`Subscription::recv`] after the subscriber registered.

use std::fmt;
use std::sync::Arc;

use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::core::subscriber::{Subscriber, SubscriberId};
use crate::error::FlowError;
use crate::policies::BufferPolicy;

type Launch = Box<dyn FnOnce() + Send>;

/// Consumer handle of one flow subscription.
pub struct Subscription<T: Clone + Send + 'static> {
    subscriber: Arc<Subscriber<T>>,
    launch: Option<Launch>,
    token: Option<CancellationToken>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    pub(crate) fn new(subscriber: Arc<Subscriber<T>>) -> Self {
        Self {
            subscriber,
            launch: None,
            token: None,
        }
    }

    /// Attaches a launch hook run once on first receive, and a token cancelled
    /// when the handle goes away.
    pub(crate) fn with_launch(mut self, launch: Launch, token: CancellationToken) -> Self {
        self.launch = Some(launch);
        self.token = Some(token);
        self
    }

    /// Id of the underlying subscriber (see `cancel` on the owning flow).
    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    /// Number of values waiting in this subscription's buffer.
    pub fn pending(&self) -> usize {
        self.subscriber.pending()
    }

    /// Buffer policy this subscription was created with.
    pub fn policy(&self) -> BufferPolicy {
        self.subscriber.policy()
    }

    /// True once the flow closed this subscription or cancelled it; values
    /// already buffered can still be received.
    pub fn is_closed(&self) -> bool {
        self.subscriber.is_closed()
    }

    /// Receives the next value.
    ///
    /// - `Ok(Some(v))`: next value in emission order;
    /// - `Ok(None)`: end-of-stream, repeated on every later call;
    /// - `Err(FlowError::OwnerExited)`: the wait was cancelled by the flow owner.
    pub async fn recv(&mut self) -> Result<Option<T>, FlowError> {
        if let Some(launch) = self.launch.take() {
            self.subscriber.ensure_registered();
            launch();
        }
        self.subscriber.next().await
    }

    /// Receives the next value, folding cancellation into end-of-stream.
    pub async fn next(&mut self) -> Option<T> {
        self.recv().await.ok().flatten()
    }

    /// Converts the handle into a [`Stream`] ending at end-of-stream or
    /// cancellation.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            let value = sub.next().await?;
            Some((value, sub))
        })
    }

    /// Detaches explicitly; same as dropping the handle.
    pub fn cancel(self) {
        drop(self);
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.subscriber)
            .field("cold", &self.token.is_some())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.subscriber.detach();
        if let Some(token) = &self.token {
            token.cancel();
        }
    }
}
