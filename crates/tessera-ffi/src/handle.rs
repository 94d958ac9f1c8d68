//! Generation-checked handle table for values owned across the C boundary.
//!
//! A handle packs a slot index (high 32 bits) and the slot's generation
//! (low 32 bits). Removing a value bumps the generation, so a destroyed
//! handle no longer resolves and destroying it twice is a no-op.

use std::fmt;

/// Decoded form of a `u64` handle.
#[derive(Clone, Copy, PartialEq, Eq)]
struct RawHandle {
    slot: u32,
    generation: u32,
}

impl RawHandle {
    fn pack(self) -> u64 {
        (u64::from(self.slot) << 32) | u64::from(self.generation)
    }

    fn unpack(handle: u64) -> Self {
        Self {
            slot: (handle >> 32) as u32,
            generation: handle as u32,
        }
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot table mapping `u64` handles to owned values.
pub(crate) struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    vacant: Vec<u32>,
}

impl<T> HandleTable<T> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> u64 {
        let slot = match self.vacant.pop() {
            Some(slot) => slot,
            None => {
                self.entries.push(Entry {
                    generation: 0,
                    value: None,
                });
                (self.entries.len() - 1) as u32
            }
        };
        let entry = &mut self.entries[slot as usize];
        entry.value = Some(value);
        RawHandle {
            slot,
            generation: entry.generation,
        }
        .pack()
    }

    fn entry(&self, handle: u64) -> Option<&Entry<T>> {
        let raw = RawHandle::unpack(handle);
        self.entries
            .get(raw.slot as usize)
            .filter(|e| e.generation == raw.generation)
    }

    /// Value behind `handle`, or `None` if it is stale or was never issued.
    pub fn get(&self, handle: u64) -> Option<&T> {
        self.entry(handle)?.value.as_ref()
    }

    /// Take the value behind `handle` out of the table.
    ///
    /// A slot whose generation wraps to zero is retired rather than reused,
    /// so a handle from its first epoch can never resolve again.
    pub fn remove(&mut self, handle: u64) -> Option<T> {
        let raw = RawHandle::unpack(handle);
        let entry = self
            .entries
            .get_mut(raw.slot as usize)
            .filter(|e| e.generation == raw.generation)?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        if entry.generation != 0 {
            self.vacant.push(raw.slot);
        }
        Some(value)
    }

    /// Number of live values.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value.is_some()).count()
    }
}
