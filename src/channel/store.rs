//! Channel registry implementation
//!
//! Name-indexed, sorted collection of channels with atomic get-or-create.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::buffer::DEFAULT_BUFFER_CAPACITY;
use crate::error::{RelayError, Result};

use super::entry::Channel;

/// Central registry for all channels
///
/// Thread-safe via `RwLock`. Lookups of existing channels share the read lock;
/// only the first reference to a new name takes the write lock.
#[derive(Debug)]
pub struct ChannelRegistry {
    /// Map of channel name to channel, kept in name order
    channels: RwLock<BTreeMap<String, Arc<Channel>>>,

    /// Buffer capacity for newly created channels
    buffer_capacity: u32,
}

impl ChannelRegistry {
    /// Create a registry whose channels use the default buffer capacity
    pub fn new() -> Self {
        Self::build(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a registry whose channels buffer `buffer_capacity` payloads
    pub fn with_capacity(buffer_capacity: u32) -> Result<Self> {
        if buffer_capacity == 0 {
            return Err(RelayError::InvalidCapacity);
        }

        Ok(Self::build(buffer_capacity))
    }

    pub(crate) fn build(buffer_capacity: u32) -> Self {
        Self {
            channels: RwLock::new(BTreeMap::new()),
            buffer_capacity: buffer_capacity.max(1),
        }
    }

    /// Buffer capacity used for new channels
    pub fn buffer_capacity(&self) -> u32 {
        self.buffer_capacity
    }

    /// Get a channel, creating it if it doesn't exist
    ///
    /// Concurrent first references to the same name observe the same channel:
    /// the existence check and the insert happen under one write lock.
    pub async fn get_or_create(&self, name: &str) -> Arc<Channel> {
        if let Some(channel) = self.channels.read().await.get(name) {
            return Arc::clone(channel);
        }

        let mut channels = self.channels.write().await;

        // Another caller may have created it between the two locks
        if let Some(channel) = channels.get(name) {
            return Arc::clone(channel);
        }

        let channel = Arc::new(Channel::build(name.to_owned(), self.buffer_capacity));
        channels.insert(name.to_owned(), Arc::clone(&channel));

        tracing::info!(
            channel = %name,
            capacity = self.buffer_capacity,
            channels = channels.len(),
            "Channel created"
        );

        channel
    }

    /// Look up an existing channel
    pub async fn get(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.read().await.get(name).cloned()
    }

    /// Remove a channel from the registry
    ///
    /// Holders of the returned channel (or other clones of it) can keep using it;
    /// the next `get_or_create` for this name builds a fresh one.
    pub async fn remove(&self, name: &str) -> Option<Arc<Channel>> {
        let removed = self.channels.write().await.remove(name);

        if removed.is_some() {
            tracing::debug!(channel = %name, "Channel removed");
        }

        removed
    }

    /// Check if a channel exists
    pub async fn contains(&self, name: &str) -> bool {
        self.channels.read().await.contains_key(name)
    }

    /// Names of all channels, in sorted order
    pub async fn names(&self) -> Vec<String> {
        self.channels.read().await.keys().cloned().collect()
    }

    /// Get total number of channels
    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Check if the registry holds no channels
    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }

    /// Remove every channel, returning them in name order
    pub async fn drain(&self) -> Vec<Arc<Channel>> {
        let mut channels = self.channels.write().await;
        std::mem::take(&mut *channels).into_values().collect()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
