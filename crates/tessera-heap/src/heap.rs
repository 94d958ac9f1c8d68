//! The managed heap: array allocation, lookup, and reference stores.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use indexmap::IndexSet;
use tessera_core::{
    ArrayAllocator, ArrayError, ArrayRef, ArrayShape, CoopGuard, CorElementType, TypeHandle,
};

use crate::barrier::WriteBarrier;
use crate::config::{HeapConfig, WORD};
use crate::error::HeapError;
use crate::raw;
use crate::segment::{SegmentList, SegmentStorage};
use crate::view::{
    decode_header, encode_primitive_header, encode_typed_header, metadata_words, ArrayClass,
    ArrayView, DecodedHeader, COUNT_WORD, DIMS_WORD, HEADER_WORD,
};

/// Snapshot of heap occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapStats {
    /// Segments created, regular and dedicated.
    pub segments: usize,
    /// Bytes reserved for segment storage.
    pub reserved_bytes: usize,
    /// Bytes handed out to objects.
    pub used_bytes: usize,
    /// Objects allocated since creation.
    pub objects: u64,
}

/// One dimension of a general array: `(lower_bound, length)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Dimension {
    lower: i32,
    length: i32,
}

/// A non-collecting segmented heap for array objects.
///
/// Objects are bump-allocated into zeroed segments and never move or die.
/// Every object address stays valid for the heap's lifetime. Exact array
/// types are interned into a type table so headers fit in one word.
pub struct ManagedHeap {
    config: HeapConfig,
    segments: Mutex<SegmentList>,
    /// Every segment, sorted by base address.
    directory: RwLock<Vec<Arc<SegmentStorage>>>,
    types: RwLock<IndexSet<TypeHandle>>,
    objects: AtomicU64,
}

impl ManagedHeap {
    /// Create a heap from a validated configuration.
    pub fn new(config: HeapConfig) -> Result<Self, HeapError> {
        config.validate()?;
        let list = SegmentList::new(&config);
        let directory = vec![Arc::clone(list.first_storage())];
        tracing::debug!(
            segment_words = config.segment_words,
            max_heap_bytes = config.max_heap_bytes,
            "managed heap created"
        );
        Ok(Self {
            config,
            segments: Mutex::new(list),
            directory: RwLock::new(directory),
            types: RwLock::new(IndexSet::new()),
            objects: AtomicU64::new(0),
        })
    }

    /// The configuration this heap was built with.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Current occupancy.
    pub fn stats(&self) -> HeapStats {
        let list = self.segments.lock().unwrap_or_else(PoisonError::into_inner);
        HeapStats {
            segments: list.segment_count(),
            reserved_bytes: list.reserved_bytes(),
            used_bytes: list.used_words() * WORD,
            objects: self.objects.load(Ordering::Relaxed),
        }
    }

    /// Allocate a compact vector of `array_type`.
    pub fn alloc_vector(&self, array_type: &TypeHandle, length: i32) -> Result<ArrayRef, HeapError> {
        debug_assert!(
            array_type.is_compact_vector(),
            "alloc_vector on non-vector type {array_type}"
        );
        let count = checked_length(0, length)?;
        let element_size = array_type
            .array_element()
            .map_or(WORD, |e| e.element_size());
        let header = encode_typed_header(self.intern(array_type));
        self.alloc_object(header, ArrayShape::Vector, &[], count, element_size)
    }

    /// Allocate a compact vector of a primitive kind.
    pub fn alloc_primitive_vector(
        &self,
        kind: CorElementType,
        length: i32,
    ) -> Result<ArrayRef, HeapError> {
        debug_assert!(kind.is_primitive(), "{kind} is not primitive");
        let count = checked_length(0, length)?;
        let element_size = kind.primitive_size().unwrap_or(WORD);
        self.alloc_object(
            encode_primitive_header(kind),
            ArrayShape::Vector,
            &[],
            count,
            element_size,
        )
    }

    /// Allocate from an encoded bounds buffer.
    ///
    /// For general arrays `bounds` holds `rank` lengths or `2 * rank`
    /// interleaved `(lower_bound, length)` pairs. For a compact vector
    /// type, extra entries describe a jagged array: each slot of the outer
    /// vector is filled with an inner array built from the remaining
    /// lengths.
    ///
    /// # Panics
    ///
    /// Panics if the bounds count matches neither encoding, or if a jagged
    /// request names a vector whose element is not itself an array.
    pub fn alloc_general(
        &self,
        coop: &CoopGuard<'_>,
        array_type: &TypeHandle,
        bounds: &[i32],
    ) -> Result<ArrayRef, HeapError> {
        let shape = array_type
            .array_shape()
            .unwrap_or_else(|| panic!("alloc_general on non-array type {array_type}"));
        match shape {
            ArrayShape::Vector => {
                assert!(!bounds.is_empty(), "vector allocation needs a length");
                let outer = self.alloc_vector(array_type, bounds[0])?;
                if bounds.len() > 1 {
                    self.fill_jagged(coop, outer, array_type, &bounds[1..])?;
                }
                Ok(outer)
            }
            ArrayShape::MultiDim { rank } => {
                let rank = rank as usize;
                let with_lower_bounds = match bounds.len() {
                    n if n == rank => false,
                    n if n == 2 * rank => true,
                    n => panic!("{n} bounds for rank-{rank} array {array_type}"),
                };
                let dims: Vec<Dimension> = (0..rank)
                    .map(|i| {
                        if with_lower_bounds {
                            Dimension {
                                lower: bounds[2 * i],
                                length: bounds[2 * i + 1],
                            }
                        } else {
                            Dimension {
                                lower: 0,
                                length: bounds[i],
                            }
                        }
                    })
                    .collect();
                let mut count: usize = 1;
                for (dim, d) in dims.iter().enumerate() {
                    let length = checked_length(dim, d.length)?;
                    if d.lower.checked_add(d.length).is_none() {
                        return Err(HeapError::Overflow {
                            reason: format!(
                                "dimension {dim}: lower bound {} plus length {} exceeds i32",
                                d.lower, d.length
                            ),
                        });
                    }
                    count = count.checked_mul(length).ok_or_else(|| HeapError::Overflow {
                        reason: format!("element count of {array_type} overflows"),
                    })?;
                }
                let element_size = array_type
                    .array_element()
                    .map_or(WORD, |e| e.element_size());
                let header = encode_typed_header(self.intern(array_type));
                self.alloc_object(header, shape, &dims, count, element_size)
            }
        }
    }

    fn fill_jagged(
        &self,
        coop: &CoopGuard<'_>,
        outer: ArrayRef,
        array_type: &TypeHandle,
        inner_bounds: &[i32],
    ) -> Result<(), HeapError> {
        let inner_type = array_type
            .array_element()
            .filter(|e| e.is_array())
            .unwrap_or_else(|| panic!("jagged bounds for {array_type} whose element is not an array"))
            .clone();
        let len = self.view(outer).map_or(0, |v| v.len());
        for index in 0..len {
            let inner = self.alloc_general(coop, &inner_type, inner_bounds)?;
            self.set_reference(coop, outer, index, Some(inner))?;
        }
        Ok(())
    }

    fn intern(&self, array_type: &TypeHandle) -> usize {
        if let Some(index) = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_index_of(array_type)
        {
            return index;
        }
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        let (index, inserted) = types.insert_full(array_type.clone());
        if inserted {
            tracing::trace!(index, array_type = %array_type, "array type interned");
        }
        index
    }

    fn alloc_object(
        &self,
        header: usize,
        shape: ArrayShape,
        dims: &[Dimension],
        count: usize,
        element_size: usize,
    ) -> Result<ArrayRef, HeapError> {
        let overflow = || HeapError::Overflow {
            reason: format!("{count} elements of {element_size} bytes overflow the heap"),
        };
        let data_bytes = count.checked_mul(element_size).ok_or_else(overflow)?;
        if data_bytes > isize::MAX as usize {
            return Err(overflow());
        }
        let total_words = metadata_words(shape)
            .checked_add(data_bytes.div_ceil(WORD))
            .ok_or_else(overflow)?;

        let placement = {
            let mut list = self.segments.lock().unwrap_or_else(PoisonError::into_inner);
            let placement = list.alloc(total_words).inspect_err(|e| {
                tracing::warn!(error = %e, words = total_words, "array allocation failed");
            })?;
            if placement.grew {
                let mut directory = self.directory.write().unwrap_or_else(PoisonError::into_inner);
                let at = directory.partition_point(|s| s.base() < placement.storage.base());
                directory.insert(at, Arc::clone(&placement.storage));
                tracing::debug!(
                    words = placement.storage.capacity(),
                    segments = directory.len(),
                    "heap segment added"
                );
            }
            placement
        };

        let storage = &placement.storage;
        let at = placement.offset;
        storage.store(at + COUNT_WORD, count);
        for (i, d) in dims.iter().enumerate() {
            storage.store(at + DIMS_WORD + i, d.length as usize);
            storage.store(at + DIMS_WORD + dims.len() + i, d.lower as isize as usize);
        }
        storage.mark_start(at);
        // Header last: a non-zero header marks a fully initialised object.
        storage.store(at + HEADER_WORD, header);
        self.objects.fetch_add(1, Ordering::Relaxed);

        let addr = storage.base() + at * WORD;
        tracing::trace!(addr, words = total_words, count, "array allocated");
        ArrayRef::from_addr(addr).ok_or(HeapError::UnknownObject { addr })
    }

    fn storage_for(&self, addr: usize) -> Option<Arc<SegmentStorage>> {
        let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
        let after = directory.partition_point(|s| s.base() <= addr);
        let candidate = directory.get(after.checked_sub(1)?)?;
        candidate.contains(addr).then(|| Arc::clone(candidate))
    }

    /// Validate `array` and return a view of it.
    ///
    /// Returns `None` for addresses that are not the start of a live
    /// object in this heap.
    pub fn view(&self, array: ArrayRef) -> Option<ArrayView> {
        let storage = self.storage_for(array.addr())?;
        let index = storage.word_index(array.addr())?;
        if !storage.is_start(index) || index + DIMS_WORD > storage.capacity() {
            return None;
        }
        let (class, shape, element_size) = match decode_header(storage.load(index + HEADER_WORD))? {
            DecodedHeader::Primitive(kind) => (
                ArrayClass::Primitive(kind),
                ArrayShape::Vector,
                kind.primitive_size()?,
            ),
            DecodedHeader::Typed(type_index) => {
                let ty = self
                    .types
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_index(type_index)?
                    .clone();
                let shape = ty.array_shape()?;
                let element_size = ty.array_element().map_or(WORD, |e| e.element_size());
                (ArrayClass::Typed(ty), shape, element_size)
            }
        };
        let count = storage.load(index + COUNT_WORD);
        let data_words = count.checked_mul(element_size)?.div_ceil(WORD);
        let end = index
            .checked_add(metadata_words(shape))?
            .checked_add(data_words)?;
        if end > storage.capacity() {
            return None;
        }
        Some(ArrayView::new(storage, index, class, shape, count, element_size))
    }

    fn reference_view(&self, array: ArrayRef, role: &str) -> Result<ArrayView, HeapError> {
        let view = self
            .view(array)
            .ok_or(HeapError::UnknownObject { addr: array.addr() })?;
        if !view.holds_references() {
            return Err(HeapError::InvalidCopy {
                reason: format!("{role} array {array} does not hold references"),
            });
        }
        Ok(view)
    }

    /// Store `value` into slot `index` of a reference array and dirty the
    /// slot's card.
    pub fn set_reference(
        &self,
        _coop: &CoopGuard<'_>,
        array: ArrayRef,
        index: usize,
        value: Option<ArrayRef>,
    ) -> Result<(), HeapError> {
        let view = self.reference_view(array, "target")?;
        if index >= view.len() {
            return Err(HeapError::InvalidCopy {
                reason: format!("index {index} outside array of length {}", view.len()),
            });
        }
        view.data_words()[index].store(value.map_or(0, ArrayRef::addr), Ordering::Release);
        view.storage()
            .cards()
            .mark_range(view.data_addr() + index * WORD, WORD);
        Ok(())
    }

    /// Copy `count` references between two reference arrays, overlap
    /// allowed, then mark the destination cards.
    #[allow(unsafe_code)]
    pub fn copy_references(
        &self,
        coop: &CoopGuard<'_>,
        src: ArrayRef,
        src_index: usize,
        dest: ArrayRef,
        dest_index: usize,
        count: usize,
    ) -> Result<(), HeapError> {
        let src_view = self.reference_view(src, "source")?;
        let dest_view = self.reference_view(dest, "destination")?;
        let in_range =
            |view: &ArrayView, start: usize| start.checked_add(count).is_some_and(|end| end <= view.len());
        if !in_range(&src_view, src_index) || !in_range(&dest_view, dest_index) {
            return Err(HeapError::InvalidCopy {
                reason: format!(
                    "range of {count} from {src_index} into {dest_index} exceeds array bounds"
                ),
            });
        }
        if count == 0 {
            return Ok(());
        }
        // SAFETY: both views were validated above, so each slot range lies
        // inside live segment memory that the views keep alive. Segment
        // words are only ever accessed atomically. Pointers are derived
        // from `AtomicUsize` slices, which permit shared mutation.
        unsafe {
            raw::memmove_gc_refs(
                self,
                coop,
                dest_view.slot_ptr(dest_index),
                src_view.slot_ptr(src_index).cast_const(),
                count * WORD,
            );
        }
        Ok(())
    }

    /// Move `len` bytes of reference-bearing memory and mark the
    /// destination cards of this heap.
    ///
    /// # Safety
    ///
    /// Same contract as [`raw::memmove_gc_refs`].
    #[allow(unsafe_code)]
    pub unsafe fn memmove_gc_refs(
        &self,
        coop: &CoopGuard<'_>,
        dest: *mut u8,
        src: *const u8,
        len: usize,
    ) {
        // SAFETY: forwarded from the caller.
        unsafe { raw::memmove_gc_refs(self, coop, dest, src, len) }
    }

    /// Whether the card covering `addr` is dirty.
    pub fn is_card_marked(&self, addr: usize) -> bool {
        self.storage_for(addr)
            .is_some_and(|s| s.cards().is_marked(addr))
    }

    /// Dirty cards across every segment.
    pub fn marked_cards(&self) -> usize {
        self.directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| s.cards().marked_count())
            .sum()
    }

    /// Reset every card in every segment.
    pub fn clear_cards(&self) {
        for storage in self
            .directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            storage.cards().clear();
        }
    }
}

fn checked_length(dimension: usize, length: i32) -> Result<usize, HeapError> {
    usize::try_from(length).map_err(|_| HeapError::NegativeLength { dimension, length })
}

impl WriteBarrier for ManagedHeap {
    fn mark_range(&self, start: usize, len: usize) {
        match self.storage_for(start) {
            Some(storage) => storage.cards().mark_range(start, len),
            None => tracing::trace!(start, len, "barrier range outside heap"),
        }
    }
}

impl ArrayAllocator for ManagedHeap {
    fn allocate_vector(
        &self,
        _coop: &CoopGuard<'_>,
        array_type: &TypeHandle,
        length: i32,
    ) -> Result<ArrayRef, ArrayError> {
        Ok(self.alloc_vector(array_type, length)?)
    }

    fn allocate_primitive_vector(
        &self,
        _coop: &CoopGuard<'_>,
        kind: CorElementType,
        length: i32,
    ) -> Result<ArrayRef, ArrayError> {
        Ok(self.alloc_primitive_vector(kind, length)?)
    }

    fn allocate_general(
        &self,
        coop: &CoopGuard<'_>,
        array_type: &TypeHandle,
        bounds: &[i32],
    ) -> Result<ArrayRef, ArrayError> {
        Ok(self.alloc_general(coop, array_type, bounds)?)
    }
}

impl std::fmt::Debug for ManagedHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedHeap")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
