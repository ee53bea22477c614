//! Subscriber descriptors and the per-channel subscriber registry
//!
//! A subscriber is an id plus a callback. The registry keeps descriptors in
//! insertion order, which is also the order they are notified in.

pub mod descriptor;
pub mod registry;

pub use descriptor::{Callback, SubscriberDescriptor, SubscriberId};
pub use registry::SubscriberRegistry;
