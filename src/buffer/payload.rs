//! Payload and handle types

use bytes::Bytes;

/// An opaque published message body
///
/// Cheap to clone: the bytes are reference-counted, never copied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Payload {
    data: Bytes,
}

impl Payload {
    /// Create a payload that takes ownership of `data`
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Create a payload from a static byte slice
    pub fn from_static(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
        }
    }

    /// Size of the payload in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload carries no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the underlying `Bytes` (shares the allocation)
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Consume the payload, returning the underlying `Bytes`
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&'static str> for Payload {
    fn from(data: &'static str) -> Self {
        Self::from_static(data.as_bytes())
    }
}

impl From<String> for Payload {
    fn from(data: String) -> Self {
        Self::new(data)
    }
}

/// Token identifying one retained payload
///
/// Only [`RingBuffer::push`](super::RingBuffer::push) creates handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    /// Buffer instance that issued the handle
    buffer_id: u64,
    slot_index: u32,
    generation: u64,
}

impl Handle {
    pub(crate) fn new(buffer_id: u64, slot_index: u32, generation: u64) -> Self {
        Self {
            buffer_id,
            slot_index,
            generation,
        }
    }

    /// Id of the buffer that issued this handle
    pub fn buffer_id(&self) -> u64 {
        self.buffer_id
    }

    /// Slot the payload was written to
    pub fn slot_index(&self) -> u32 {
        self.slot_index
    }

    /// Generation of the slot at write time
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.slot_index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_size_and_bytes() {
        let payload = Payload::new(vec![1u8, 2, 3]);
        assert_eq!(payload.size(), 3);
        assert_eq!(payload.as_bytes(), &[1, 2, 3]);
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_payload_clone_shares_allocation() {
        let payload = Payload::new(vec![0u8; 64]);
        let copy = payload.clone();
        assert_eq!(payload.as_bytes().as_ptr(), copy.as_bytes().as_ptr());
    }

    #[test]
    fn test_payload_conversions() {
        assert_eq!(Payload::from("abc"), Payload::from_static(b"abc"));
        assert_eq!(Payload::from(String::from("abc")).size(), 3);
        assert!(Payload::from(Bytes::new()).is_empty());
    }

    #[test]
    fn test_handle_display() {
        let handle = Handle::new(7, 4, 2);
        assert_eq!(handle.to_string(), "4@2");
        assert_eq!(handle.slot_index(), 4);
        assert_eq!(handle.buffer_id(), 7);
        assert_eq!(handle.generation(), 2);
    }
}
