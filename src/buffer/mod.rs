//! Bounded payload retention
//!
//! Every channel owns one [`RingBuffer`]. Publishing moves a [`Payload`] into
//! the next slot (round-robin) and hands back a [`Handle`] naming that slot and
//! the slot's generation at the time of the write.
//!
//! ```text
//!   push #0   push #1         push #C-1   push #C
//!     │         │                │          │
//!     ▼         ▼                ▼          ▼
//!   ┌──────┬──────┬─── ... ───┬──────┐
//!   │ s0 g0│ s1 g0│           │sC-1 g0│   s0 is rewritten: g0 → g1
//!   └──────┴──────┴─── ... ───┴──────┘
//! ```
//!
//! A handle is valid only while its generation matches the slot's current
//! generation. Once a slot is overwritten, lookups through older handles fail
//! with [`RelayError::Evicted`](crate::error::RelayError::Evicted) instead of
//! reading whatever now lives in the slot.
//!
//! Payloads are `bytes::Bytes` underneath, so reads hand out reference-counted
//! clones. A reader that keeps a clone keeps the old allocation alive; the ring
//! only ever drops its own reference when the slot is recycled.

pub mod payload;
pub mod ring;

pub use payload::{Handle, Payload};
pub use ring::{RingBuffer, DEFAULT_BUFFER_CAPACITY};
