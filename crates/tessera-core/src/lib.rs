//! Core types and traits for the Tessera array runtime.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Tessera workspace:
//! type identifiers, runtime type descriptors, the primitive element tag,
//! object references, error types, and the collaborator traits through
//! which array creation reaches the type loader, the allocator, and the
//! collector's thread-mode coordination.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod error;
pub mod id;
pub mod mode;
pub mod object;
pub mod traits;
pub mod types;

pub use element::CorElementType;
pub use error::{ArrayError, NotSupportedReason};
pub use id::{EntryPoint, TypeId};
pub use mode::CoopGuard;
pub use object::ArrayRef;
pub use traits::{ArrayAllocator, CooperativeMode, TypeLoader};
pub use types::{
    ArrayShape, ArrayType, ConcreteType, GenericOwner, GenericParameter, TypeDescriptor,
    TypeHandle, TypeKind,
};

/// Upper bound on array rank accepted anywhere in the runtime.
///
/// Bounds buffers are sized from this constant, so it caps stack scratch
/// usage at `2 * MAX_RANK` 32-bit entries.
pub const MAX_RANK: usize = 32;
