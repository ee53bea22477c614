//! Relay orchestration
//!
//! The [`Relay`] owns the channel registry and performs fan-out:
//!
//! ```text
//!   publish(name, payload)
//!     │
//!     ├─► registry.get_or_create(name) ──► Arc<Channel>
//!     ├─► channel.publish(payload)      ──► Handle
//!     └─► notify(name, handle)
//!           ├─► channel.prepare_dispatch(handle)   payload + subscriber snapshot
//!           └─► DispatchPolicy
//!                 Synchronous    one blocking thread, in order, joined
//!                 Parallel       one blocking thread per subscriber, joined
//!                 FireAndForget  one blocking thread, in order, detached
//! ```
//!
//! Callbacks always run on tokio's blocking pool, never while a channel lock is
//! held and never on an async worker thread.

pub mod config;
pub mod dispatch;
pub mod engine;

pub use config::{DispatchPolicy, RelayConfig};
pub use dispatch::{CallbackInvoker, DeliveryReport, Invoker};
pub use engine::Relay;
