//! Named channels and the channel registry
//!
//! A [`Channel`] pairs one [`RingBuffer`](crate::buffer::RingBuffer) with one
//! [`SubscriberRegistry`](crate::subscriber::SubscriberRegistry). Channels are
//! created on first reference through [`ChannelRegistry::get_or_create`] and
//! live until removed explicitly.
//!
//! # Locking
//!
//! ```text
//!   ChannelRegistry ── RwLock<BTreeMap<name, Arc<Channel>>>
//!                                             │
//!                       ┌─────────────────────┴──────────────┐
//!                       ▼                                    ▼
//!              RingBuffer (RwLock)             SubscriberRegistry (Mutex)
//! ```
//!
//! Each lock covers one structure. Nothing holds two of them at once, and no
//! callback ever runs while any of them is held.

pub mod entry;
pub mod store;

pub use entry::{Channel, ChannelStats, Dispatch};
pub use store::ChannelRegistry;
