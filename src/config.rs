//! # Flow configuration.
//!
//! Provides [`FlowConfig`], the settings shared by every flow constructor.
//!
//! Config is used in two ways:
//! 1. **Flow creation**: `MutableSharedFlow::with_config(cfg)`, `MutableStateFlow::with_config(v, cfg)`,
//!    `ColdFlow::with_config(builder, cfg)`
//! 2. **Per-subscriber buffers**: every `subscribe()` builds a fresh buffer from
//!    [`FlowConfig::policy_clamped`].
//!
//! ## Sentinel values
//! - `capacity = 0` in `Sliding`/`Stalling` → treated as `1`

use std::borrow::Cow;

use crate::policies::BufferPolicy;

/// Configuration for a flow instance.
///
/// ## Field semantics
/// - `policy`: backpressure policy used to build each subscriber's buffer
/// - `label`: name attached to log records emitted by this flow
#[derive(Clone, Debug)]
pub struct FlowConfig {
    /// Buffer policy instantiated once per subscriber.
    ///
    /// Defaults to `Stalling { capacity: 5 }`, the only policy that makes
    /// producers wait for slow consumers.
    pub policy: BufferPolicy,

    /// Human-readable flow name for logs.
    pub label: Cow<'static, str>,
}

impl FlowConfig {
    /// Creates a configuration with the given policy and the default label.
    pub fn new(policy: BufferPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Sets the log label.
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// Returns the policy with capacities clamped to a minimum of 1.
    #[inline]
    pub fn policy_clamped(&self) -> BufferPolicy {
        self.policy.clamped()
    }
}

impl Default for FlowConfig {
    /// Default configuration:
    ///
    /// - `policy = Stalling { capacity: 5 }`
    /// - `label = "flow"`
    fn default() -> Self {
        Self {
            policy: BufferPolicy::default(),
            label: Cow::Borrowed("flow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_stalling_five() {
        let cfg = FlowConfig::default();
        assert_eq!(cfg.policy, BufferPolicy::Stalling { capacity: 5 });
        assert_eq!(cfg.label, "flow");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cfg = FlowConfig::new(BufferPolicy::Sliding { capacity: 0 }).with_label("ticks");
        assert_eq!(cfg.policy_clamped(), BufferPolicy::Sliding { capacity: 1 });
        assert_eq!(cfg.label, "ticks");
    }
}
