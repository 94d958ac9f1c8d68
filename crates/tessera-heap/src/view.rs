//! Read access to allocated arrays.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tessera_core::{ArrayRef, ArrayShape, CorElementType, TypeHandle};

use crate::config::WORD;
use crate::segment::SegmentStorage;

/// Word index of the header inside an object.
pub(crate) const HEADER_WORD: usize = 0;
/// Word index of the total element count.
pub(crate) const COUNT_WORD: usize = 1;
/// First word after the fixed prefix.
pub(crate) const DIMS_WORD: usize = 2;

/// Header tag bit marking a primitive-vector header.
const PRIMITIVE_TAG: usize = 1;

/// What an object's header word says about its type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayClass {
    /// Compact vector of a primitive kind, allocated without a type handle.
    Primitive(CorElementType),
    /// Array whose exact type is known.
    Typed(TypeHandle),
}

/// Header word encoding: primitive kinds are tagged odd, typed headers
/// store `(type_index + 1) << 1`. Zero never appears in a live header.
pub(crate) fn encode_primitive_header(kind: CorElementType) -> usize {
    ((kind as usize) << 1) | PRIMITIVE_TAG
}

pub(crate) fn encode_typed_header(type_index: usize) -> usize {
    (type_index + 1) << 1
}

pub(crate) enum DecodedHeader {
    Primitive(CorElementType),
    Typed(usize),
}

pub(crate) fn decode_header(word: usize) -> Option<DecodedHeader> {
    if word == 0 {
        return None;
    }
    if word & PRIMITIVE_TAG != 0 {
        let kind = CorElementType::from_raw(i32::try_from(word >> 1).ok()?)?;
        return kind.is_primitive().then_some(DecodedHeader::Primitive(kind));
    }
    Some(DecodedHeader::Typed((word >> 1) - 1))
}

/// Words occupied by the header, count, and per-dimension metadata.
pub(crate) fn metadata_words(shape: ArrayShape) -> usize {
    match shape {
        ArrayShape::Vector => DIMS_WORD,
        ArrayShape::MultiDim { rank } => DIMS_WORD + 2 * rank as usize,
    }
}

/// A validated window onto one array object.
///
/// Layout, in words from the object address:
///
/// ```text
/// [header][count]                                   data...   (vector)
/// [header][count][len_0..len_r][lower_0..lower_r]   data...   (multi-dim)
/// ```
///
/// Data is `count * element_size` bytes rounded up to whole words.
/// Reference-typed slots hold an [`ArrayRef`] address or zero.
#[derive(Clone)]
pub struct ArrayView {
    storage: Arc<SegmentStorage>,
    index: usize,
    class: ArrayClass,
    shape: ArrayShape,
    count: usize,
    element_size: usize,
}

impl ArrayView {
    pub(crate) fn new(
        storage: Arc<SegmentStorage>,
        index: usize,
        class: ArrayClass,
        shape: ArrayShape,
        count: usize,
        element_size: usize,
    ) -> Self {
        Self {
            storage,
            index,
            class,
            shape,
            count,
            element_size,
        }
    }

    /// Reference to the viewed object.
    pub fn array_ref(&self) -> ArrayRef {
        ArrayRef::from_addr(self.storage.base() + self.index * WORD)
            .unwrap_or_else(|| unreachable!("segment memory is never at address zero"))
    }

    /// Header classification.
    pub fn class(&self) -> &ArrayClass {
        &self.class
    }

    /// Exact array type, unless the object is a primitive vector.
    pub fn array_type(&self) -> Option<&TypeHandle> {
        match &self.class {
            ArrayClass::Typed(ty) => Some(ty),
            ArrayClass::Primitive(_) => None,
        }
    }

    /// Element type descriptor, unless the object is a primitive vector.
    pub fn element_type(&self) -> Option<&TypeHandle> {
        self.array_type().and_then(|t| t.array_element())
    }

    /// Normalised element tag: enums report their underlying primitive and
    /// every reference type reports `Class`.
    pub fn element_kind(&self) -> CorElementType {
        match &self.class {
            ArrayClass::Primitive(kind) => *kind,
            ArrayClass::Typed(ty) => ty
                .array_element()
                .map_or(CorElementType::Class, |e| e.verifier_element_type()),
        }
    }

    /// Whether slots hold object references.
    pub fn holds_references(&self) -> bool {
        self.element_kind() == CorElementType::Class
    }

    /// Array shape.
    pub fn shape(&self) -> ArrayShape {
        self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> u32 {
        self.shape.rank()
    }

    /// Total element count across all dimensions.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bytes per element.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Length of dimension `dim`.
    pub fn length(&self, dim: u32) -> Option<i32> {
        match self.shape {
            ArrayShape::Vector if dim == 0 => i32::try_from(self.count).ok(),
            ArrayShape::MultiDim { rank } if dim < rank => {
                Some(self.storage.load(self.index + DIMS_WORD + dim as usize) as i32)
            }
            _ => None,
        }
    }

    /// Lower bound of dimension `dim`.
    pub fn lower_bound(&self, dim: u32) -> Option<i32> {
        match self.shape {
            ArrayShape::Vector if dim == 0 => Some(0),
            ArrayShape::MultiDim { rank } if dim < rank => Some(
                self.storage
                    .load(self.index + DIMS_WORD + (rank + dim) as usize) as i32,
            ),
            _ => None,
        }
    }

    /// Lengths of every dimension.
    pub fn lengths(&self) -> Vec<i32> {
        (0..self.rank()).filter_map(|d| self.length(d)).collect()
    }

    /// Lower bounds of every dimension.
    pub fn lower_bounds(&self) -> Vec<i32> {
        (0..self.rank()).filter_map(|d| self.lower_bound(d)).collect()
    }

    fn data_index(&self) -> usize {
        self.index + metadata_words(self.shape)
    }

    /// Address of the first data byte.
    pub fn data_addr(&self) -> usize {
        self.storage.base() + self.data_index() * WORD
    }

    /// Size of the element data in bytes.
    pub fn data_bytes(&self) -> usize {
        self.count * self.element_size
    }

    /// Element data as whole words.
    pub fn data_words(&self) -> &[AtomicUsize] {
        self.storage
            .words(self.data_index(), self.data_bytes().div_ceil(WORD))
    }

    /// Reference stored in slot `index`. `None` for null, out-of-range,
    /// or non-reference arrays.
    pub fn reference_at(&self, index: usize) -> Option<ArrayRef> {
        if !self.holds_references() || index >= self.count {
            return None;
        }
        ArrayRef::from_addr(self.data_words()[index].load(Ordering::Acquire))
    }

    pub(crate) fn slot_ptr(&self, index: usize) -> *mut u8 {
        self.data_words()[index..].as_ptr().cast_mut().cast()
    }

    pub(crate) fn storage(&self) -> &SegmentStorage {
        &self.storage
    }
}

impl std::fmt::Debug for ArrayView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayView")
            .field("array", &self.array_ref())
            .field("class", &self.class)
            .field("shape", &self.shape)
            .field("len", &self.count)
            .finish()
    }
}
