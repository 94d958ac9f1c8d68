//! Card tables and the write-barrier seam.
//!
//! The collector tracks which regions of the heap received reference stores
//! by dividing each segment into fixed-size cards and dirtying a byte per
//! card. Bulk copies mark every card their destination range touches once
//! the data is in place.

use std::sync::atomic::{AtomicU8, Ordering};

/// Card byte value for a clean card.
pub const CARD_CLEAN: u8 = 0;

/// Card byte value for a dirty card.
pub const CARD_DIRTY: u8 = 0xff;

/// Records that a byte range of managed memory received reference stores.
///
/// Addresses outside the memory the barrier covers are ignored.
pub trait WriteBarrier: Send + Sync {
    /// Mark every card overlapping `[start, start + len)`.
    fn mark_range(&self, start: usize, len: usize);
}

/// One dirty byte per `1 << shift` bytes of a contiguous address range.
pub struct CardTable {
    base: usize,
    len_bytes: usize,
    shift: u32,
    cards: Box<[AtomicU8]>,
}

impl CardTable {
    /// Build a clean table covering `[base, base + len_bytes)`.
    pub fn new(base: usize, len_bytes: usize, shift: u32) -> Self {
        let card_count = len_bytes.div_ceil(1 << shift).max(1);
        Self {
            base,
            len_bytes,
            shift,
            cards: (0..card_count).map(|_| AtomicU8::new(CARD_CLEAN)).collect(),
        }
    }

    /// First covered address.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Card size in bytes.
    pub fn card_bytes(&self) -> usize {
        1 << self.shift
    }

    /// Number of cards in the table.
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Whether `addr` lies in the covered range.
    pub fn covers(&self, addr: usize) -> bool {
        addr >= self.base && addr - self.base < self.len_bytes
    }

    /// Whether the card containing `addr` is dirty. Uncovered addresses
    /// report clean.
    pub fn is_marked(&self, addr: usize) -> bool {
        if !self.covers(addr) {
            return false;
        }
        self.cards[(addr - self.base) >> self.shift].load(Ordering::Acquire) == CARD_DIRTY
    }

    /// Number of dirty cards.
    pub fn marked_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|c| c.load(Ordering::Acquire) == CARD_DIRTY)
            .count()
    }

    /// Reset every card to clean.
    pub fn clear(&self) {
        for card in self.cards.iter() {
            card.store(CARD_CLEAN, Ordering::Release);
        }
    }
}

impl WriteBarrier for CardTable {
    fn mark_range(&self, start: usize, len: usize) {
        if len == 0 {
            return;
        }
        let end = start.saturating_add(len);
        let covered_end = self.base + self.len_bytes;
        let lo = start.max(self.base);
        let hi = end.min(covered_end);
        if lo >= hi {
            return;
        }
        let first = (lo - self.base) >> self.shift;
        let last = (hi - 1 - self.base) >> self.shift;
        for card in &self.cards[first..=last] {
            // Skip the store when already dirty to keep the line shared.
            if card.load(Ordering::Relaxed) != CARD_DIRTY {
                card.store(CARD_DIRTY, Ordering::Release);
            }
        }
    }
}

impl std::fmt::Debug for CardTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardTable")
            .field("base", &format_args!("{:#x}", self.base))
            .field("len_bytes", &self.len_bytes)
            .field("card_bytes", &self.card_bytes())
            .field("marked", &self.marked_count())
            .finish()
    }
}
