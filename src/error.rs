//! Relay error types
//!
//! Expected outcomes such as a missing subscriber are expressed as `Option`;
//! the variants here are the recoverable failures callers may want to match on.

use crate::subscriber::SubscriberId;

/// Error type for relay operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The slot referenced by a handle has been overwritten (or cleared)
    Evicted {
        /// Slot index carried by the stale handle
        slot: u32,
        /// Generation carried by the stale handle
        generation: u64,
    },
    /// A subscriber with this id is already registered on the channel
    DuplicateSubscriber(SubscriberId),
    /// A subscriber descriptor was submitted with an empty id
    EmptySubscriberId,
    /// A ring buffer was requested with zero capacity
    InvalidCapacity,
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Evicted { slot, generation } => {
                write!(f, "Payload evicted (slot {}, generation {})", slot, generation)
            }
            RelayError::DuplicateSubscriber(id) => {
                write!(f, "Subscriber already registered: {}", id)
            }
            RelayError::EmptySubscriberId => write!(f, "Subscriber id must not be empty"),
            RelayError::InvalidCapacity => write!(f, "Ring buffer capacity must be non-zero"),
        }
    }
}

impl std::error::Error for RelayError {}

/// Result alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
