//! Channel type
//!
//! This module defines the per-channel state stored in the registry.

use std::time::Instant;

use crate::buffer::{Handle, Payload, RingBuffer, DEFAULT_BUFFER_CAPACITY};
use crate::error::{RelayError, Result};
use crate::subscriber::{SubscriberDescriptor, SubscriberId, SubscriberRegistry};

/// A named topic: one payload buffer plus its subscribers
///
/// The buffer and subscriber list are only reachable through these methods.
#[derive(Debug)]
pub struct Channel {
    name: String,
    buffer: RingBuffer,
    subscribers: SubscriberRegistry,
    created_at: Instant,
}

impl Channel {
    /// Create a channel with the default buffer capacity
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a channel whose buffer holds `capacity` payloads
    pub fn with_capacity(name: impl Into<String>, capacity: u32) -> Result<Self> {
        if capacity == 0 {
            return Err(RelayError::InvalidCapacity);
        }
        Ok(Self::build(name.into(), capacity))
    }

    pub(crate) fn build(name: String, capacity: u32) -> Self {
        Self {
            name,
            buffer: RingBuffer::build(capacity),
            subscribers: SubscriberRegistry::new(),
            created_at: Instant::now(),
        }
    }

    /// Channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the channel was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Store a payload in the channel's buffer
    pub async fn publish(&self, payload: Payload) -> Handle {
        self.buffer.push(payload).await
    }

    /// Retrieve a retained payload
    pub async fn fetch(&self, handle: Handle) -> Result<Payload> {
        self.buffer.get(handle).await
    }

    /// Register a subscriber
    ///
    /// Returns false if the id is empty or already registered on this channel.
    pub async fn subscribe(&self, descriptor: SubscriberDescriptor) -> bool {
        self.subscribers.add(descriptor).await
    }

    /// Register a subscriber, reporting the reason for a rejection
    pub async fn try_subscribe(&self, descriptor: SubscriberDescriptor) -> Result<()> {
        self.subscribers.try_add(descriptor).await
    }

    /// Remove a subscriber, returning it if it was registered
    pub async fn unsubscribe(&self, id: &SubscriberId) -> Option<SubscriberDescriptor> {
        self.subscribers.remove(id).await
    }

    /// Check if a subscriber is registered
    pub async fn has_subscriber(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains(id).await
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.size()
    }

    /// Resolve a handle and snapshot the subscribers for fan-out
    ///
    /// Both locks are released before this returns, so the result can be run
    /// on any thread without blocking publishers or subscribers.
    pub async fn prepare_dispatch(&self, handle: Handle) -> Dispatch {
        let payload = self.buffer.get(handle).await;
        let subscribers = self.subscribers.snapshot().await;

        Dispatch {
            handle,
            payload,
            subscribers,
        }
    }

    /// Deliver the payload behind `handle` to every subscriber, in order
    ///
    /// `invoke_fn` is called once per subscriber with either the payload or the
    /// eviction error. Returns the number of subscribers visited.
    pub async fn dispatch<F>(&self, handle: Handle, invoke_fn: F) -> usize
    where
        F: FnMut(&SubscriberDescriptor, std::result::Result<&Payload, &RelayError>),
    {
        self.prepare_dispatch(handle).await.run(invoke_fn)
    }

    /// Get channel statistics
    pub async fn stats(&self) -> ChannelStats {
        ChannelStats {
            name: self.name.clone(),
            subscriber_count: self.subscribers.size(),
            buffered: self.buffer.len().await,
            capacity: self.buffer.capacity(),
            published: self.buffer.total_pushed().await,
        }
    }

    /// Drop every subscriber and empty the buffer
    ///
    /// All handles issued by this channel become stale.
    pub async fn clear(&self) {
        let dropped = self.subscribers.clear().await;
        self.buffer.clear().await;

        tracing::debug!(channel = %self.name, subscribers = dropped, "Channel cleared");
    }
}

/// A resolved payload paired with the subscribers it should reach
///
/// Produced by [`Channel::prepare_dispatch`]; owns everything it needs, so it can
/// be moved to another thread.
#[derive(Debug, Clone)]
pub struct Dispatch {
    handle: Handle,
    payload: Result<Payload>,
    subscribers: Vec<SubscriberDescriptor>,
}

impl Dispatch {
    /// Handle the payload was resolved from
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// The resolved payload, or the eviction error
    pub fn payload(&self) -> std::result::Result<&Payload, &RelayError> {
        self.payload.as_ref()
    }

    /// Subscribers in notification order
    pub fn subscribers(&self) -> &[SubscriberDescriptor] {
        &self.subscribers
    }

    /// Number of subscribers to notify
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if there is nobody to notify
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Check if the payload was overwritten before it could be resolved
    pub fn is_evicted(&self) -> bool {
        self.payload.is_err()
    }

    /// Call `invoke_fn` for each subscriber in order; returns how many were visited
    pub fn run<F>(&self, mut invoke_fn: F) -> usize
    where
        F: FnMut(&SubscriberDescriptor, std::result::Result<&Payload, &RelayError>),
    {
        for descriptor in &self.subscribers {
            invoke_fn(descriptor, self.payload.as_ref());
        }
        self.subscribers.len()
    }
}

/// Statistics for a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    /// Channel name
    pub name: String,
    /// Number of registered subscribers
    pub subscriber_count: usize,
    /// Number of payloads currently retained
    pub buffered: usize,
    /// Buffer capacity in payloads
    pub capacity: u32,
    /// Payloads published over the channel's lifetime
    pub published: u64,
}
