//! Relay configuration

use crate::buffer::DEFAULT_BUFFER_CAPACITY;

/// How a publish waits for subscriber callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// Run callbacks one after another, in subscription order, on a blocking
    /// thread; `publish` returns once every callback has finished
    #[default]
    Synchronous,
    /// Run each callback on its own blocking thread and join them all before
    /// `publish` returns; callbacks may overlap and start in any order
    Parallel,
    /// Return as soon as the payload is stored; callbacks run later, in
    /// subscription order, on a detached blocking thread
    FireAndForget,
}

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Number of payloads each channel retains
    pub buffer_capacity: u32,

    /// Delivery policy for publish and notify
    pub dispatch_policy: DispatchPolicy,

    /// Maximum callbacks running at once under [`DispatchPolicy::Parallel`]
    /// (0 = unlimited)
    pub max_concurrent_callbacks: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            dispatch_policy: DispatchPolicy::Synchronous,
            max_concurrent_callbacks: 0, // Unlimited
        }
    }
}

impl RelayConfig {
    /// Set the per-channel buffer capacity (at least 1)
    pub fn buffer_capacity(mut self, capacity: u32) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// Set the dispatch policy
    pub fn dispatch_policy(mut self, policy: DispatchPolicy) -> Self {
        self.dispatch_policy = policy;
        self
    }

    /// Join every callback before publish returns (the default)
    pub fn synchronous(self) -> Self {
        self.dispatch_policy(DispatchPolicy::Synchronous)
    }

    /// Run callbacks concurrently, at most `max` at a time (0 = unlimited)
    pub fn parallel(self, max: usize) -> Self {
        self.dispatch_policy(DispatchPolicy::Parallel)
            .max_concurrent_callbacks(max)
    }

    /// Deliver in the background after storing
    pub fn fire_and_forget(self) -> Self {
        self.dispatch_policy(DispatchPolicy::FireAndForget)
    }

    /// Set the concurrency bound for parallel dispatch
    pub fn max_concurrent_callbacks(mut self, max: usize) -> Self {
        self.max_concurrent_callbacks = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.buffer_capacity, 256);
        assert_eq!(config.dispatch_policy, DispatchPolicy::Synchronous);
        assert_eq!(config.max_concurrent_callbacks, 0);
    }

    #[test]
    fn test_builder_buffer_capacity_clamped() {
        let config = RelayConfig::default().buffer_capacity(0);

        assert_eq!(config.buffer_capacity, 1);
    }

    #[test]
    fn test_builder_parallel() {
        let config = RelayConfig::default().parallel(4);

        assert_eq!(config.dispatch_policy, DispatchPolicy::Parallel);
        assert_eq!(config.max_concurrent_callbacks, 4);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::default()
            .buffer_capacity(16)
            .fire_and_forget()
            .max_concurrent_callbacks(2)
            .synchronous();

        assert_eq!(config.buffer_capacity, 16);
        assert_eq!(config.dispatch_policy, DispatchPolicy::Synchronous);
        assert_eq!(config.max_concurrent_callbacks, 2);
    }
}
