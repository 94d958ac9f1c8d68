//! Collaborator traits for array creation.
//!
//! Array creation depends on three services it does not implement itself:
//! a type loader that materializes array types, an allocation primitive
//! that carves objects out of the managed heap, and the thread-mode
//! primitive that moves a thread in and out of collector-cooperative mode.
//! Each is a trait so the dispatcher can be exercised against recording
//! doubles as well as the real runtime.

use crate::element::CorElementType;
use crate::error::ArrayError;
use crate::mode::CoopGuard;
use crate::object::ArrayRef;
use crate::types::{ArrayShape, TypeHandle};
use crate::MAX_RANK;

/// Resolves array types for an element type.
///
/// Implementations must be memoized and thread-safe: concurrent calls for
/// the same `(element, shape)` pair converge to one canonical handle.
pub trait TypeLoader: Send + Sync {
    /// Return the canonical array type of `element` with `shape`,
    /// materializing it on first request.
    fn load_array_type(
        &self,
        element: &TypeHandle,
        shape: ArrayShape,
    ) -> Result<TypeHandle, ArrayError>;

    /// Largest rank this type system supports. Never above [`MAX_RANK`].
    fn max_rank(&self) -> u32 {
        MAX_RANK as u32
    }
}

/// Collection-aware allocation primitive.
///
/// Every method requires the caller to be in cooperative mode, witnessed
/// by the `coop` borrow. Allocation may synchronously trigger a collection.
pub trait ArrayAllocator: Send + Sync {
    /// Allocate a compact vector of `length` elements of `array_type`.
    fn allocate_vector(
        &self,
        coop: &CoopGuard<'_>,
        array_type: &TypeHandle,
        length: i32,
    ) -> Result<ArrayRef, ArrayError>;

    /// Allocate a compact vector of a primitive element kind without
    /// consulting the type loader.
    fn allocate_primitive_vector(
        &self,
        coop: &CoopGuard<'_>,
        kind: CorElementType,
        length: i32,
    ) -> Result<ArrayRef, ArrayError>;

    /// Allocate an array of `array_type` from an encoded bounds buffer:
    /// `rank` lengths, or `2 * rank` interleaved `(lower_bound, length)`
    /// pairs.
    fn allocate_general(
        &self,
        coop: &CoopGuard<'_>,
        array_type: &TypeHandle,
        bounds: &[i32],
    ) -> Result<ArrayRef, ArrayError>;
}

/// Thread-state coordination with the collector.
///
/// `enter` moves the calling thread into cooperative mode (it may touch
/// managed memory and must reach safe points promptly); `leave` returns it
/// to preemptible mode. Calls nest and are always paired by [`CoopGuard`].
pub trait CooperativeMode: Send + Sync {
    /// Enter cooperative mode on the calling thread.
    fn enter(&self);

    /// Leave cooperative mode on the calling thread.
    fn leave(&self);
}
