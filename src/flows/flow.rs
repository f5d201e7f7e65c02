use std::sync::Arc;

use crate::core::{Publisher, Subscriber, Subscription};
use crate::policies::BufferPolicy;

/// Anything a consumer can subscribe to.
///
/// Each call starts an independent consumption pass with its own buffer.
/// Hot flows register the pass with their shared publisher on the first
/// receive; cold flows start a fresh producer for it.
pub trait Flow<T: Clone + Send + 'static> {
    /// Opens a new subscription.
    fn subscribe(&self) -> Subscription<T>;
}

/// Builds a subscription on `publisher`; it registers on its first pull but
/// can be cancelled by id right away.
pub(crate) fn attach<T: Clone + Send + 'static>(
    publisher: &Arc<Publisher<T>>,
    policy: BufferPolicy,
) -> Subscription<T> {
    let subscriber = Subscriber::new(policy.build(), Arc::downgrade(publisher));
    publisher.track(&subscriber);
    Subscription::new(subscriber)
}
