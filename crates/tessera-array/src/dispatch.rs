//! Allocation dispatch for array creation.
//!
//! [`ArrayFactory`] picks the cheapest allocation path for a request:
//!
//! | Request | Condition | Path |
//! |---|---|---|
//! | array type | compact vector | `allocate_vector` |
//! | element type | rank 1, zero lower bound, primitive | `allocate_primitive_vector` |
//! | element type | rank 1, zero lower bound, other | resolve `T[]`, `allocate_vector` |
//! | either | otherwise | resolve `T[*]`/`T[,..]`, encode bounds, `allocate_general` |
//!
//! Element types are validated before anything is resolved or allocated,
//! and array types are resolved before entering cooperative mode so a
//! thread waiting on the type cache never holds the collector off.

use tracing::trace;

use tessera_core::{
    ArrayAllocator, ArrayError, ArrayRef, ArrayShape, CoopGuard, CooperativeMode,
    NotSupportedReason, TypeHandle, TypeLoader, MAX_RANK,
};

use crate::bounds::encode_bounds;
use crate::request::ArrayRequest;
use crate::validate::check_element_type;

/// Creates array instances through a type loader, an allocator, and the
/// thread-mode primitive.
#[derive(Clone, Copy)]
pub struct ArrayFactory<'a> {
    loader: &'a dyn TypeLoader,
    allocator: &'a dyn ArrayAllocator,
    mode: &'a dyn CooperativeMode,
}

impl<'a> ArrayFactory<'a> {
    /// Bind a factory to its collaborators.
    ///
    /// # Panics
    ///
    /// Panics if the loader reports a maximum rank above [`MAX_RANK`].
    pub fn new(
        loader: &'a dyn TypeLoader,
        allocator: &'a dyn ArrayAllocator,
        mode: &'a dyn CooperativeMode,
    ) -> Self {
        assert!(
            loader.max_rank() as usize <= MAX_RANK,
            "type loader max rank {} exceeds bounds capacity {MAX_RANK}",
            loader.max_rank()
        );
        Self {
            loader,
            allocator,
            mode,
        }
    }

    /// Create an array instance for `request`.
    ///
    /// # Errors
    ///
    /// - [`ArrayError::NotSupported`] if the element type is inadmissible;
    ///   nothing is resolved or allocated in that case.
    /// - [`ArrayError::OutOfMemory`] or [`ArrayError::Overflow`] from the
    ///   allocator, unchanged.
    ///
    /// # Panics
    ///
    /// Panics on malformed requests: rank zero or above the loader's
    /// maximum, or bound slices whose lengths disagree with the rank.
    /// Debug builds also panic when a compact-vector array type is given a
    /// non-zero lower bound. Release builds do not check this and ignore
    /// the bound.
    pub fn create_instance(&self, request: &ArrayRequest<'_>) -> Result<ArrayRef, ArrayError> {
        let rank = request.rank();
        let lengths = request.lengths();
        let lower_bounds = request.lower_bounds();
        assert!(
            rank >= 1 && rank <= self.loader.max_rank(),
            "rank {rank} outside 1..={}",
            self.loader.max_rank()
        );
        assert_eq!(lengths.len(), rank as usize, "lengths count does not match rank");
        if let Some(lower) = lower_bounds {
            assert_eq!(lower.len(), rank as usize, "lower bounds count does not match rank");
        }

        let array_type = match *request {
            ArrayRequest::FromArrayType { array_type, .. } => {
                debug_assert!(array_type.is_array(), "{array_type} is not an array type");
                debug_assert_eq!(array_type.array_rank(), Some(rank));
                if array_type
                    .array_element()
                    .is_some_and(|e| e.contains_generic_variables())
                {
                    return Err(NotSupportedReason::OpenGenericElement.into());
                }
                if array_type.is_compact_vector() {
                    debug_assert!(
                        request.is_zero_based_rank_one(),
                        "compact vector {array_type} with non-zero lower bound"
                    );
                    trace!(path = "vector", array_type = %array_type, length = lengths[0], "create_instance");
                    let coop = CoopGuard::enter(self.mode);
                    return self.allocator.allocate_vector(&coop, array_type, lengths[0]);
                }
                array_type.clone()
            }
            ArrayRequest::FromElementType { element, .. } => {
                check_element_type(element)?;
                if request.is_zero_based_rank_one() {
                    return self.create_vector_of(element, lengths[0]);
                }
                self.loader
                    .load_array_type(element, ArrayShape::MultiDim { rank })?
            }
        };

        let bounds = encode_bounds(lengths, lower_bounds);
        trace!(path = "general", array_type = %array_type, rank, bounds = ?bounds, "create_instance");
        let coop = CoopGuard::enter(self.mode);
        self.allocator.allocate_general(&coop, &array_type, &bounds)
    }

    fn create_vector_of(&self, element: &TypeHandle, length: i32) -> Result<ArrayRef, ArrayError> {
        let kind = element.signature_element_type();
        if kind.is_primitive() {
            trace!(path = "primitive", kind = %kind, length, "create_instance");
            let coop = CoopGuard::enter(self.mode);
            return self.allocator.allocate_primitive_vector(&coop, kind, length);
        }
        let array_type = self.loader.load_array_type(element, ArrayShape::Vector)?;
        trace!(path = "vector", array_type = %array_type, length, "create_instance");
        let coop = CoopGuard::enter(self.mode);
        self.allocator.allocate_vector(&coop, &array_type, length)
    }

    /// Allocate an instance of `array_type` from pre-encoded arguments.
    ///
    /// `packed_args` is passed to the allocator unchanged: `rank` lengths,
    /// `2 * rank` interleaved `(lower_bound, length)` pairs, or, for a
    /// vector of arrays, one length per jagged level.
    pub fn create_instance_md(
        &self,
        array_type: &TypeHandle,
        packed_args: &[i32],
    ) -> Result<ArrayRef, ArrayError> {
        debug_assert!(array_type.is_array(), "{array_type} is not an array type");
        trace!(array_type = %array_type, args = packed_args.len(), "create_instance_md");
        let coop = CoopGuard::enter(self.mode);
        self.allocator.allocate_general(&coop, array_type, packed_args)
    }
}

impl std::fmt::Debug for ArrayFactory<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayFactory")
            .field("max_rank", &self.loader.max_rank())
            .finish_non_exhaustive()
    }
}
