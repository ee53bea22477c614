//! Generation-tracked circular buffer
//!
//! Fixed-capacity storage that overwrites its oldest slot once full. Each slot
//! carries a generation counter that is bumped whenever the slot is rewritten
//! or cleared, which is what makes stale handles detectable. Handles also
//! carry the id of the buffer that issued them, so a handle never resolves
//! against a different buffer, including one rebuilt under the same channel name.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::error::{RelayError, Result};

use super::payload::{Handle, Payload};

/// Default number of slots per channel
pub const DEFAULT_BUFFER_CAPACITY: u32 = 256;

/// Source of buffer instance ids, unique for the life of the process
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// A single storage slot
#[derive(Debug, Default)]
struct Slot {
    /// Bumped on every overwrite and on clear
    generation: u64,
    /// Whether the slot has been written since construction or the last clear
    written: bool,
    payload: Option<Payload>,
}

#[derive(Debug)]
struct Ring {
    next_slot: u32,
    /// Number of occupied slots, saturates at capacity
    occupied: u32,
    /// Pushes over the ring's lifetime (not reset by clear)
    total_pushed: u64,
    slots: Vec<Slot>,
}

/// Fixed-capacity, generation-versioned payload storage
///
/// Thread-safe via `RwLock`: pushes take the write lock for slot selection and
/// store, lookups share the read lock.
#[derive(Debug)]
pub struct RingBuffer {
    id: u64,
    capacity: u32,
    inner: RwLock<Ring>,
}

impl RingBuffer {
    /// Create a ring buffer with [`DEFAULT_BUFFER_CAPACITY`] slots
    pub fn new() -> Self {
        Self::build(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a ring buffer with `capacity` slots
    ///
    /// Returns [`RelayError::InvalidCapacity`] for a capacity of zero.
    pub fn with_capacity(capacity: u32) -> Result<Self> {
        if capacity == 0 {
            return Err(RelayError::InvalidCapacity);
        }
        Ok(Self::build(capacity))
    }

    /// Infallible constructor for capacities validated elsewhere; clamps to 1
    pub(crate) fn build(capacity: u32) -> Self {
        let capacity = capacity.max(1);
        let slots = (0..capacity).map(|_| Slot::default()).collect();

        Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            inner: RwLock::new(Ring {
                next_slot: 0,
                occupied: 0,
                total_pushed: 0,
                slots,
            }),
        }
    }

    /// Instance id stamped into every handle this buffer issues
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of slots
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Store a payload in the next slot, overwriting whatever was there
    ///
    /// Takes ownership of the payload. The returned handle stays valid until the
    /// slot is written again (after `capacity` further pushes) or cleared.
    pub async fn push(&self, payload: Payload) -> Handle {
        let mut ring = self.inner.write().await;

        let slot_index = ring.next_slot;
        ring.next_slot = (slot_index + 1) % self.capacity;
        if ring.occupied < self.capacity {
            ring.occupied += 1;
        }
        ring.total_pushed += 1;

        let slot = &mut ring.slots[slot_index as usize];
        if slot.written {
            slot.generation += 1;
        }
        slot.written = true;
        slot.payload = Some(payload);

        Handle::new(self.id, slot_index, slot.generation)
    }

    /// Look up the payload behind a handle
    ///
    /// Returns a clone that shares the stored bytes. Fails with
    /// [`RelayError::Evicted`] when the slot has moved on to a newer generation.
    pub async fn get(&self, handle: Handle) -> Result<Payload> {
        self.with_payload(handle, Payload::clone).await
    }

    /// Run `f` against the payload behind a handle without cloning it
    ///
    /// The borrow is valid only for the duration of `f`; the read lock is held
    /// while it runs, so `f` must be short and must not touch this buffer.
    pub async fn with_payload<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&Payload) -> R,
    ) -> Result<R> {
        let evicted = RelayError::Evicted {
            slot: handle.slot_index(),
            generation: handle.generation(),
        };

        if handle.buffer_id() != self.id {
            return Err(evicted);
        }

        let ring = self.inner.read().await;

        let slot = ring
            .slots
            .get(handle.slot_index() as usize)
            .ok_or_else(|| evicted.clone())?;

        if slot.generation != handle.generation() {
            return Err(evicted);
        }

        slot.payload.as_ref().map(f).ok_or(evicted)
    }

    /// Empty every slot and invalidate all outstanding handles
    pub async fn clear(&self) {
        let mut ring = self.inner.write().await;

        for slot in ring.slots.iter_mut() {
            slot.generation += 1;
            slot.written = false;
            slot.payload = None;
        }
        ring.next_slot = 0;
        ring.occupied = 0;
    }

    /// Number of occupied slots
    pub async fn len(&self) -> usize {
        self.inner.read().await.occupied as usize
    }

    /// Check if no slot holds a payload
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Total number of pushes since construction
    pub async fn total_pushed(&self) -> u64 {
        self.inner.read().await.total_pushed
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn numbered(i: u32) -> Payload {
        Payload::new(format!("payload-{}", i))
    }

    #[tokio::test]
    async fn test_push_then_get() {
        let buffer = RingBuffer::with_capacity(8).unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            handles.push(buffer.push(numbered(i)).await);
        }

        for (i, handle) in handles.into_iter().enumerate() {
            let payload = buffer.get(handle).await.unwrap();
            assert_eq!(payload, numbered(i as u32));
            assert_eq!(payload.size(), numbered(i as u32).size());
        }
    }

    #[tokio::test]
    async fn test_first_handle_evicted_after_wrap() {
        let buffer = RingBuffer::with_capacity(4).unwrap();

        let first = buffer.push(numbered(0)).await;
        for i in 1..4 {
            buffer.push(numbered(i)).await;
        }
        let wrapped = buffer.push(numbered(4)).await;

        assert_eq!(
            buffer.get(first).await,
            Err(RelayError::Evicted {
                slot: 0,
                generation: 0
            })
        );
        assert_eq!(buffer.get(wrapped).await.unwrap(), numbered(4));
    }

    #[tokio::test]
    async fn test_default_capacity_wrap_scenario() {
        let buffer = RingBuffer::new();
        assert_eq!(buffer.capacity(), 256);

        let mut handles = Vec::new();
        for i in 0..256 {
            handles.push(buffer.push(numbered(i)).await);
        }
        let last = buffer.push(numbered(256)).await;

        assert_err!(buffer.get(handles[0]).await);
        assert_eq!(last.slot_index(), 0);
        assert_eq!(last.generation(), 1);
        assert_eq!(buffer.get(last).await.unwrap(), numbered(256));

        // Slot 1 has not been rewritten yet
        assert_eq!(buffer.get(handles[1]).await.unwrap(), numbered(1));
    }

    #[tokio::test]
    async fn test_clear_invalidates_handles() {
        let buffer = RingBuffer::with_capacity(4).unwrap();
        let handle = buffer.push(numbered(0)).await;

        buffer.clear().await;

        assert_err!(buffer.get(handle).await);
        assert!(buffer.is_empty().await);

        // Writing after a clear starts at slot 0 with a fresh generation
        let next = buffer.push(numbered(1)).await;
        assert_eq!(next.slot_index(), 0);
        assert_ne!(next.generation(), handle.generation());
        assert_ok!(buffer.get(next).await);
        assert_err!(buffer.get(handle).await);
    }

    #[tokio::test]
    async fn test_out_of_range_handle_is_evicted() {
        let buffer = RingBuffer::with_capacity(2).unwrap();
        let bogus = Handle::new(buffer.id(), 10, 0);
        assert!(matches!(
            buffer.get(bogus).await,
            Err(RelayError::Evicted { slot: 10, .. })
        ));
    }

    #[tokio::test]
    async fn test_unwritten_slot_is_not_readable() {
        let buffer = RingBuffer::with_capacity(2).unwrap();
        assert_err!(buffer.get(Handle::new(buffer.id(), 1, 0)).await);
    }

    #[tokio::test]
    async fn test_handle_from_other_buffer_is_evicted() {
        let first = RingBuffer::with_capacity(4).unwrap();
        let second = RingBuffer::with_capacity(4).unwrap();
        assert_ne!(first.id(), second.id());

        let handle = first.push(numbered(0)).await;
        second.push(numbered(1)).await;

        // Same slot and generation, different buffer
        assert_eq!(
            second.get(handle).await,
            Err(RelayError::Evicted {
                slot: 0,
                generation: 0
            })
        );
        assert_eq!(first.get(handle).await.unwrap(), numbered(0));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            RingBuffer::with_capacity(0).unwrap_err(),
            RelayError::InvalidCapacity
        );
    }

    #[tokio::test]
    async fn test_len_saturates_at_capacity() {
        let buffer = RingBuffer::with_capacity(3).unwrap();
        assert!(buffer.is_empty().await);

        for i in 0..5 {
            buffer.push(numbered(i)).await;
        }

        assert_eq!(buffer.len().await, 3);
        assert_eq!(buffer.total_pushed().await, 5);
    }

    #[tokio::test]
    async fn test_with_payload_borrows() {
        let buffer = RingBuffer::with_capacity(2).unwrap();
        let handle = buffer.push(Payload::from_static(b"hello")).await;

        let size = buffer.with_payload(handle, |p| p.size()).await.unwrap();
        assert_eq!(size, 5);
    }

    #[tokio::test]
    async fn test_reader_clone_survives_overwrite() {
        let buffer = RingBuffer::with_capacity(1).unwrap();
        let handle = buffer.push(numbered(0)).await;
        let kept = buffer.get(handle).await.unwrap();

        buffer.push(numbered(1)).await;

        assert_err!(buffer.get(handle).await);
        assert_eq!(kept, numbered(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_pushes_use_distinct_slots() {
        let buffer = Arc::new(RingBuffer::with_capacity(64).unwrap());

        let mut tasks = Vec::new();
        for t in 0..4u32 {
            let buffer = Arc::clone(&buffer);
            tasks.push(tokio::spawn(async move {
                let mut handles = Vec::new();
                for i in 0..16 {
                    handles.push(buffer.push(numbered(t * 100 + i)).await);
                }
                handles
            }));
        }

        let mut slots = Vec::new();
        for task in tasks {
            for handle in task.await.unwrap() {
                assert_eq!(handle.generation(), 0);
                slots.push(handle.slot_index());
            }
        }
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), 64);
        assert_eq!(buffer.len().await, 64);
    }
}
