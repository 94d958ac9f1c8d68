//! GC-safe bulk copy of reference-bearing memory.
//!
//! A collector may scan the destination while a copy is in flight, so every
//! pointer-sized slot must hold either its old or its new value at all
//! times. The copy therefore moves whole words through atomic loads and
//! stores, picks its direction so overlapping ranges are never read after
//! being overwritten, and only then dirties the destination cards.
//!
//! The raw pointer work lives here; callers in `heap` only forward into it.

#![allow(unsafe_code)]

use std::sync::atomic::{fence, AtomicUsize, Ordering};

use tessera_core::CoopGuard;

use crate::barrier::WriteBarrier;
use crate::config::WORD;

/// Move `len` bytes of reference-bearing memory from `src` to `dest`.
///
/// Ranges may overlap. No-op when `len == 0` or `dest == src`. After the
/// move, every card overlapping `[dest, dest + len)` is marked through
/// `barrier`. The `coop` borrow witnesses that the caller is in cooperative
/// mode for the whole call.
///
/// # Safety
///
/// - `dest` and `src` must be non-null and word-aligned, and `len` must be
///   a multiple of the word size.
/// - `[src, src + len)` must be valid for reads and `[dest, dest + len)`
///   valid for writes for the duration of the call.
/// - Concurrent accessors of either range must use word-sized atomic
///   operations.
pub unsafe fn memmove_gc_refs(
    barrier: &dyn WriteBarrier,
    _coop: &CoopGuard<'_>,
    dest: *mut u8,
    src: *const u8,
    len: usize,
) {
    debug_assert!(!dest.is_null(), "memmove_gc_refs: null destination");
    debug_assert!(!src.is_null(), "memmove_gc_refs: null source");
    debug_assert_eq!(dest as usize % WORD, 0, "destination not word-aligned");
    debug_assert_eq!(src as usize % WORD, 0, "source not word-aligned");
    debug_assert_eq!(len % WORD, 0, "length not a multiple of the word size");

    if len == 0 || dest.cast_const() == src {
        return;
    }

    // SAFETY: the caller guarantees both ranges are valid, aligned, and
    // accessed atomically by anyone else; the word count covers `len`.
    unsafe {
        move_words(dest.cast(), src.cast(), len / WORD, |_| {});
    }

    // Publish the moved words before any card becomes visible as dirty.
    fence(Ordering::Release);
    barrier.mark_range(dest as usize, len);
}

/// Word-atomic overlapping move of `words` words, calling `after_store`
/// with the destination index of each word just written.
///
/// Copies front-to-back when `dest` precedes `src` or the ranges are
/// disjoint, back-to-front otherwise.
///
/// # Safety
///
/// Same contract as [`memmove_gc_refs`], expressed in words.
pub(crate) unsafe fn move_words(
    dest: *mut usize,
    src: *const usize,
    words: usize,
    mut after_store: impl FnMut(usize),
) {
    let dest_addr = dest as usize;
    let src_addr = src as usize;

    let mut copy_word = |i: usize| {
        // SAFETY: `i < words`, so both offsets stay inside the ranges the
        // caller vouched for. `AtomicUsize` has the same layout as `usize`
        // and the pointers are word-aligned.
        unsafe {
            let from = AtomicUsize::from_ptr(src.add(i).cast_mut());
            let to = AtomicUsize::from_ptr(dest.add(i));
            to.store(from.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        after_store(i);
    };

    let forward = dest_addr <= src_addr || dest_addr >= src_addr + words * WORD;
    if forward {
        for i in 0..words {
            copy_word(i);
        }
    } else {
        for i in (0..words).rev() {
            copy_word(i);
        }
    }
}
