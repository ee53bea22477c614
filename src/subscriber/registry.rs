//! Insertion-ordered subscriber registry

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use crate::error::{RelayError, Result};

use super::descriptor::{SubscriberDescriptor, SubscriberId};

/// Thread-safe, insertion-ordered collection of subscribers keyed by id
///
/// The mutex guards add, remove and iteration. The live count is mirrored in an
/// atomic so `size()` never has to wait on the lock.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<Vec<SubscriberDescriptor>>,
    live: AtomicUsize,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber
    ///
    /// Returns false, leaving the registry untouched, if the id is empty or
    /// already registered.
    pub async fn add(&self, descriptor: SubscriberDescriptor) -> bool {
        match self.try_add(descriptor).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Subscriber rejected");
                false
            }
        }
    }

    /// Append a subscriber, reporting why it was rejected
    pub async fn try_add(&self, descriptor: SubscriberDescriptor) -> Result<()> {
        if descriptor.id().is_empty() {
            return Err(RelayError::EmptySubscriberId);
        }

        let mut subscribers = self.subscribers.lock().await;

        if subscribers.iter().any(|s| s.id() == descriptor.id()) {
            return Err(RelayError::DuplicateSubscriber(descriptor.id().clone()));
        }

        subscribers.push(descriptor);
        self.live.store(subscribers.len(), Ordering::Release);

        Ok(())
    }

    /// Remove a subscriber by id
    ///
    /// Returns `None` if no subscriber with that id is registered.
    pub async fn remove(&self, id: &SubscriberId) -> Option<SubscriberDescriptor> {
        let mut subscribers = self.subscribers.lock().await;

        let position = subscribers.iter().position(|s| s.id() == id)?;
        let removed = subscribers.remove(position);
        self.live.store(subscribers.len(), Ordering::Release);

        Some(removed)
    }

    /// Visit every live subscriber in insertion order
    ///
    /// The registry lock is held for the whole walk, so `visitor` must not call
    /// back into this registry. Use [`snapshot`](Self::snapshot) for work that
    /// may block or re-enter.
    pub async fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(usize, &SubscriberDescriptor),
    {
        let subscribers = self.subscribers.lock().await;

        for (index, descriptor) in subscribers.iter().enumerate() {
            visitor(index, descriptor);
        }
    }

    /// Copy of the live subscribers in insertion order
    pub async fn snapshot(&self) -> Vec<SubscriberDescriptor> {
        self.subscribers.lock().await.clone()
    }

    /// Check if a subscriber with this id is registered
    pub async fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers.lock().await.iter().any(|s| s.id() == id)
    }

    /// Remove every subscriber, returning how many were dropped
    pub async fn clear(&self) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        let dropped = subscribers.len();
        subscribers.clear();
        self.live.store(0, Ordering::Release);
        dropped
    }

    /// Number of live subscribers
    pub fn size(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Check if no subscribers are registered
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::buffer::Payload;

    use super::*;

    fn noop(id: &str) -> SubscriberDescriptor {
        SubscriberDescriptor::new(id, |_: &Payload| {})
    }

    #[tokio::test]
    async fn test_add_and_size() {
        let registry = SubscriberRegistry::new();
        for id in ["a", "b", "c", "d"] {
            assert!(registry.add(noop(id)).await);
        }
        assert_eq!(registry.size(), 4);
        assert!(!registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_present_and_absent() {
        let registry = SubscriberRegistry::new();
        registry.add(noop("a")).await;
        registry.add(noop("b")).await;

        let removed = registry.remove(&SubscriberId::from("a")).await.unwrap();
        assert_eq!(removed.id().as_str(), "a");
        assert_eq!(registry.size(), 1);

        // Second removal of the same id is a no-op
        assert!(registry.remove(&SubscriberId::from("a")).await.is_none());
        assert!(registry.remove(&SubscriberId::from("zzz")).await.is_none());
        assert_eq!(registry.size(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_empty_ids_rejected() {
        let registry = SubscriberRegistry::new();
        assert!(registry.add(noop("a")).await);
        assert!(!registry.add(noop("a")).await);
        assert!(!registry.add(noop("")).await);

        assert_eq!(
            registry.try_add(noop("a")).await,
            Err(RelayError::DuplicateSubscriber(SubscriberId::from("a")))
        );
        assert_eq!(
            registry.try_add(noop("")).await,
            Err(RelayError::EmptySubscriberId)
        );
        assert_eq!(registry.size(), 1);
    }

    #[tokio::test]
    async fn test_for_each_insertion_order() {
        let registry = SubscriberRegistry::new();
        for id in ["c", "a", "b"] {
            registry.add(noop(id)).await;
        }
        registry.remove(&SubscriberId::from("a")).await;
        registry.add(noop("a")).await;

        let mut visited = Vec::new();
        registry
            .for_each(|index, descriptor| visited.push((index, descriptor.id().to_string())))
            .await;

        assert_eq!(
            visited,
            vec![
                (0, "c".to_string()),
                (1, "b".to_string()),
                (2, "a".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = SubscriberRegistry::new();
        registry.add(noop("a")).await;

        let snapshot = registry.snapshot().await;
        registry.add(noop("b")).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.size(), 2);
        assert!(registry.contains(&SubscriberId::from("b")).await);
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = SubscriberRegistry::new();
        registry.add(noop("a")).await;
        registry.add(noop("b")).await;

        assert_eq!(registry.clear().await, 2);
        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_remove() {
        let registry = Arc::new(SubscriberRegistry::new());

        let mut tasks = Vec::new();
        for t in 0..8 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    let id = format!("{}_{}", t, i);
                    assert!(registry.add(noop(&id)).await);
                    if i % 2 == 0 {
                        assert!(registry.remove(&SubscriberId::from(id)).await.is_some());
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.size(), 8 * 25);
        assert_eq!(registry.snapshot().await.len(), 8 * 25);
    }
}
