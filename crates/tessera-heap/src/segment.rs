//! Word segments and growable segment lists.
//!
//! A [`SegmentStorage`] is a fixed, zero-initialised block of atomic words
//! together with the card table covering it. Its base address never moves,
//! so object addresses handed out by the heap stay valid for the heap's
//! lifetime. A [`SegmentList`] bump-allocates from the current segment and
//! grows by appending new ones; requests larger than a regular segment get
//! a dedicated segment sized to fit.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::barrier::CardTable;
use crate::config::{HeapConfig, WORD};
use crate::error::HeapError;

/// Backing memory of one segment.
pub struct SegmentStorage {
    words: Box<[AtomicUsize]>,
    /// One bit per word, set on the first word of every allocated object.
    starts: Box<[AtomicU64]>,
    cards: CardTable,
}

impl SegmentStorage {
    fn new(capacity_words: usize, card_shift: u32) -> Self {
        let words: Box<[AtomicUsize]> = (0..capacity_words).map(|_| AtomicUsize::new(0)).collect();
        let cards = CardTable::new(words.as_ptr() as usize, capacity_words * WORD, card_shift);
        let starts = (0..capacity_words.div_ceil(64))
            .map(|_| AtomicU64::new(0))
            .collect();
        Self {
            words,
            starts,
            cards,
        }
    }

    /// Address of word 0.
    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// Capacity in words.
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Whether `addr` lies inside this segment.
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base() && addr - self.base() < self.capacity() * WORD
    }

    /// Word index of a contained, word-aligned address.
    pub fn word_index(&self, addr: usize) -> Option<usize> {
        if !self.contains(addr) || (addr - self.base()) % WORD != 0 {
            return None;
        }
        Some((addr - self.base()) / WORD)
    }

    /// Words `[offset, offset + len)`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the segment.
    pub fn words(&self, offset: usize, len: usize) -> &[AtomicUsize] {
        &self.words[offset..offset + len]
    }

    /// Load one word.
    pub fn load(&self, index: usize) -> usize {
        self.words[index].load(Ordering::Acquire)
    }

    /// Store one word.
    pub fn store(&self, index: usize, value: usize) {
        self.words[index].store(value, Ordering::Release);
    }

    /// Record that an object begins at word `index`.
    pub fn mark_start(&self, index: usize) {
        self.starts[index / 64].fetch_or(1 << (index % 64), Ordering::Release);
    }

    /// Whether an object begins at word `index`.
    pub fn is_start(&self, index: usize) -> bool {
        self.starts
            .get(index / 64)
            .is_some_and(|bits| bits.load(Ordering::Acquire) & (1 << (index % 64)) != 0)
    }

    /// Card table covering this segment.
    pub fn cards(&self) -> &CardTable {
        &self.cards
    }
}

/// A segment's storage plus its bump cursor.
pub struct Segment {
    storage: Arc<SegmentStorage>,
    cursor: usize,
}

impl Segment {
    /// Create a zeroed segment of `capacity_words` words.
    pub fn new(capacity_words: usize, card_shift: u32) -> Self {
        Self {
            storage: Arc::new(SegmentStorage::new(capacity_words, card_shift)),
            cursor: 0,
        }
    }

    /// Bump-allocate `len` words, returning the starting word offset.
    ///
    /// Returns `None` if the segment lacks room.
    pub fn alloc(&mut self, len: usize) -> Option<usize> {
        let new_cursor = self.cursor.checked_add(len)?;
        if new_cursor > self.storage.capacity() {
            return None;
        }
        let offset = self.cursor;
        self.cursor = new_cursor;
        Some(offset)
    }

    /// Shared handle to the backing storage.
    pub fn storage(&self) -> &Arc<SegmentStorage> {
        &self.storage
    }

    /// Words allocated so far.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Free words remaining.
    pub fn remaining(&self) -> usize {
        self.storage.capacity() - self.cursor
    }
}

/// Result of a successful [`SegmentList::alloc`].
pub struct Placement {
    /// Segment holding the new object.
    pub storage: Arc<SegmentStorage>,
    /// Word offset of the object inside the segment.
    pub offset: usize,
    /// A new segment was created to satisfy the request.
    pub grew: bool,
}

/// A growable list of [`Segment`]s with overflow-based bump allocation.
///
/// Objects never span segments. When the current segment is full a new
/// regular segment is appended, provided the heap limit allows it.
pub struct SegmentList {
    segments: Vec<Segment>,
    segment_words: usize,
    card_shift: u32,
    max_bytes: usize,
    reserved_bytes: usize,
    current: usize,
}

impl SegmentList {
    /// Create a list with one pre-allocated regular segment.
    pub fn new(config: &HeapConfig) -> Self {
        Self {
            segments: vec![Segment::new(config.segment_words, config.card_shift)],
            segment_words: config.segment_words,
            card_shift: config.card_shift,
            max_bytes: config.max_heap_bytes,
            reserved_bytes: config.segment_bytes(),
            current: 0,
        }
    }

    /// Bump-allocate `len` words, growing the list if needed.
    pub fn alloc(&mut self, len: usize) -> Result<Placement, HeapError> {
        if len > self.segment_words {
            return self.alloc_dedicated(len);
        }

        if let Some(offset) = self.segments[self.current].alloc(len) {
            return Ok(Placement {
                storage: Arc::clone(self.segments[self.current].storage()),
                offset,
                grew: false,
            });
        }

        self.reserve(self.segment_words * WORD, len * WORD)?;
        let mut seg = Segment::new(self.segment_words, self.card_shift);
        let offset = seg.alloc(len).ok_or(HeapError::Overflow {
            reason: format!("{len} words do not fit a fresh segment"),
        })?;
        let storage = Arc::clone(seg.storage());
        self.segments.push(seg);
        self.current = self.segments.len() - 1;
        Ok(Placement {
            storage,
            offset,
            grew: true,
        })
    }

    fn alloc_dedicated(&mut self, len: usize) -> Result<Placement, HeapError> {
        let bytes = len.checked_mul(WORD).ok_or(HeapError::Overflow {
            reason: format!("{len} words overflow the address space"),
        })?;
        self.reserve(bytes, bytes)?;
        let mut seg = Segment::new(len, self.card_shift);
        let offset = seg.alloc(len).ok_or(HeapError::Overflow {
            reason: format!("{len} words do not fit a dedicated segment"),
        })?;
        let storage = Arc::clone(seg.storage());
        // Dedicated segments are full on creation; keep filling `current`.
        self.segments.push(seg);
        Ok(Placement {
            storage,
            offset,
            grew: true,
        })
    }

    fn reserve(&mut self, segment_bytes: usize, requested: usize) -> Result<(), HeapError> {
        let total = self.reserved_bytes.checked_add(segment_bytes);
        match total {
            Some(total) if total <= self.max_bytes => {
                self.reserved_bytes = total;
                Ok(())
            }
            _ => Err(HeapError::CapacityExceeded {
                requested,
                capacity: self.max_bytes,
            }),
        }
    }

    /// Storage of the segment created with the list.
    pub fn first_storage(&self) -> &Arc<SegmentStorage> {
        self.segments[0].storage()
    }

    /// Number of segments, regular and dedicated.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Bytes reserved across all segments.
    pub fn reserved_bytes(&self) -> usize {
        self.reserved_bytes
    }

    /// Words handed out across all segments.
    pub fn used_words(&self) -> usize {
        self.segments.iter().map(Segment::used).sum()
    }
}
