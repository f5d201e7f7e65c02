//! Error types used by flows and their subscriptions.
//!
//! [`FlowError`] covers the recoverable conditions a caller may inspect:
//!
//! - [`FlowError::OwnerExited`]: a pending wait was abandoned because its
//!   subscription was cancelled, or a cold-flow builder tried to emit after its
//!   consumer went away.
//! - [`FlowError::Builder`]: a cold-flow builder finished with an error.
//!
//! End-of-stream is **not** an error: the pull primitive reports it as
//! `Ok(None)`. Contract violations (two concurrent waits on one subscriber, a
//! waiter resolved twice) are caller bugs and panic instead of returning here.
//!
//! Like the rest of the crate, the enum provides helper methods (`as_label`,
//! `as_message`) for logs/metrics.

use thiserror::Error;

/// # Errors produced by flows.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The subscription owning a pending wait left its scope (cancelled or dropped).
    #[error("subscription owner exited its scope")]
    OwnerExited,

    /// A cold-flow builder returned an error.
    #[error("flow builder failed: {error}")]
    Builder {
        /// The underlying error message.
        error: String,
    },
}

impl FlowError {
    /// Builds a [`FlowError::Builder`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use flowcast::FlowError;
    ///
    /// let err = FlowError::builder("socket closed");
    /// assert_eq!(err.to_string(), "flow builder failed: socket closed");
    /// ```
    pub fn builder(error: impl std::fmt::Display) -> Self {
        FlowError::Builder {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use flowcast::FlowError;
    ///
    /// assert_eq!(FlowError::OwnerExited.as_label(), "flow_owner_exited");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FlowError::OwnerExited => "flow_owner_exited",
            FlowError::Builder { .. } => "flow_builder_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            FlowError::OwnerExited => "owner exited scope".to_string(),
            FlowError::Builder { error } => format!("builder error: {error}"),
        }
    }

    /// Indicates whether the error means the consumer side is gone.
    ///
    /// Cold-flow builders use this to tell a normal stop (nobody listens
    /// anymore) from a real failure.
    pub fn is_owner_exited(&self) -> bool {
        matches!(self, FlowError::OwnerExited)
    }
}
