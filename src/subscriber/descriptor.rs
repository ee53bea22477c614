//! Subscriber identity and callback types

use std::sync::Arc;

use crate::buffer::Payload;

/// Callback invoked with each payload delivered to a subscriber
///
/// Callbacks may run on any thread and concurrently with other subscribers'
/// callbacks. The payload reference is only valid for the call; clone it to keep it.
pub type Callback = Arc<dyn Fn(&Payload) + Send + Sync>;

/// Unique identifier of a subscriber within its channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(String);

impl SubscriberId {
    /// Create a new subscriber id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the id is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for SubscriberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A registered subscriber
///
/// Cloning is cheap; clones share the same callback.
#[derive(Clone)]
pub struct SubscriberDescriptor {
    id: SubscriberId,
    callback: Callback,
}

impl SubscriberDescriptor {
    /// Create a descriptor from an id and a closure
    pub fn new<F>(id: impl Into<SubscriberId>, callback: F) -> Self
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            callback: Arc::new(callback),
        }
    }

    /// Create a descriptor from an id and an already shared callback
    pub fn with_callback(id: impl Into<SubscriberId>, callback: Callback) -> Self {
        Self {
            id: id.into(),
            callback,
        }
    }

    /// The subscriber's id
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// The subscriber's callback
    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    /// Call the subscriber's callback with a payload
    pub fn invoke(&self, payload: &Payload) {
        (self.callback)(payload)
    }
}

impl std::fmt::Debug for SubscriberDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberDescriptor")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_subscriber_id_conversions() {
        let id = SubscriberId::from("imu_3");
        assert_eq!(id.as_str(), "imu_3");
        assert_eq!(id, SubscriberId::new(String::from("imu_3")));
        assert_eq!(id.to_string(), "imu_3");
        assert!(SubscriberId::from("").is_empty());
    }

    #[test]
    fn test_descriptor_invoke() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let descriptor = SubscriberDescriptor::new("a", move |payload: &Payload| {
            counter.fetch_add(payload.size(), Ordering::SeqCst);
        });

        descriptor.invoke(&Payload::from_static(b"abcd"));
        descriptor.clone().invoke(&Payload::from_static(b"ef"));

        assert_eq!(seen.load(Ordering::SeqCst), 6);
        assert_eq!(descriptor.id().as_str(), "a");
    }

    #[test]
    fn test_descriptor_debug_hides_callback() {
        let descriptor = SubscriberDescriptor::new("dbg", |_: &Payload| {});
        let rendered = format!("{:?}", descriptor);
        assert!(rendered.contains("dbg"));
    }
}
