//! In-process publish/subscribe relay
//!
//! Publishers push payloads into named channels; every subscriber registered on
//! that channel receives each payload through its callback.
//!
//! - [`buffer`]: generation-tracked ring buffer that retains recent payloads
//! - [`subscriber`]: subscriber descriptors and the per-channel registry
//! - [`channel`]: channels and the name-indexed channel registry
//! - [`relay`]: the [`Relay`] facade, dispatch policies and the [`Invoker`] seam
//!
//! # Example
//! ```no_run
//! use msg_relay::{Payload, Relay, RelayConfig};
//!
//! # async fn example() {
//! let relay = Relay::with_config(RelayConfig::default().buffer_capacity(64));
//!
//! relay
//!     .subscribe("gps", |fix: &Payload| println!("fix: {:?}", fix.as_bytes()))
//!     .await;
//!
//! let handle = relay.publish("gps", Payload::from_static(b"48.85,2.35")).await;
//! assert!(relay.fetch("gps", handle).await.is_ok());
//! # }
//! ```

pub mod buffer;
pub mod channel;
pub mod error;
pub mod relay;
pub mod subscriber;

pub use buffer::{Handle, Payload, RingBuffer};
pub use channel::{Channel, ChannelRegistry, ChannelStats};
pub use error::{RelayError, Result};
pub use relay::{CallbackInvoker, DeliveryReport, DispatchPolicy, Invoker, Relay, RelayConfig};
pub use subscriber::{Callback, SubscriberDescriptor, SubscriberId, SubscriberRegistry};
