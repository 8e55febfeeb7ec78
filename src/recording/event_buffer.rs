// src/recording/event_buffer.rs
//! Fixed-capacity staging buffer for pending events
//!
//! Events are stored column-wise (instruction ids, addresses, operation
//! codes) so each channel compresses as one homogeneous array. The three
//! columns are allocated once and never resized; only the first `len`
//! entries of each are valid.
//!
//! The buffer has no locking of its own. The `Recorder` serializes access.

use crate::recording::event::Event;

/// Column-oriented event buffer
#[derive(Debug)]
pub struct EventBuffer {
    instruction_ids: Box<[u32]>,
    addresses: Box<[usize]>,
    operations: Box<[u8]>,
    len: usize,
}

impl EventBuffer {
    /// Create a buffer holding up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            instruction_ids: vec![0; capacity].into_boxed_slice(),
            addresses: vec![0; capacity].into_boxed_slice(),
            operations: vec![0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Append an event; returns `false` without storing it when full
    #[inline]
    pub fn push(&mut self, event: Event) -> bool {
        let n = self.len;
        if n == self.capacity() {
            return false;
        }

        self.instruction_ids[n] = event.instruction_id;
        self.addresses[n] = event.address;
        self.operations[n] = event.operation;
        self.len = n + 1;
        true
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of valid entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.operations.len()
    }

    /// Forget all entries. Only called after a successful drain.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn instruction_ids(&self) -> &[u32] {
        &self.instruction_ids[..self.len]
    }

    pub fn addresses(&self) -> &[usize] {
        &self.addresses[..self.len]
    }

    pub fn operations(&self) -> &[u8] {
        &self.operations[..self.len]
    }

    /// Entry at `index`, reassembled from the three columns
    pub fn get(&self, index: usize) -> Option<Event> {
        if index >= self.len {
            return None;
        }

        Some(Event {
            instruction_id: self.instruction_ids[index],
            address: self.addresses[index],
            operation: self.operations[index],
        })
    }
}
