//! Tessera: array-instance creation for a managed runtime.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tessera sub-crates. For most users, adding `tessera` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! let rt = ArrayRuntime::new(RuntimeConfig::default()).unwrap();
//! let int32 = rt.registry().builtin(CorElementType::I4).unwrap().clone();
//!
//! // int[2, 3] indexed from 1.
//! let request = ArrayRequest::from_element_type(&int32, &[2, 3]).with_lower_bounds(&[1, 1]);
//! let array = rt.create_instance(&request).unwrap();
//!
//! let view = rt.heap().view(array).unwrap();
//! assert_eq!(view.len(), 6);
//! assert_eq!(view.lower_bounds(), vec![1, 1]);
//! assert_eq!(rt.cor_element_type_of_element_type(array), Some(CorElementType::I4));
//!
//! // Stack-only element types are rejected before anything is allocated.
//! let span = rt
//!     .registry()
//!     .define_concrete("Span", ConcreteType::value_type(16).by_ref_like());
//! let err = rt
//!     .create_instance(&ArrayRequest::from_element_type(&span, &[4]))
//!     .unwrap_err();
//! assert_eq!(err, ArrayError::NotSupported(NotSupportedReason::ByRefLikeElement));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessera-core` | Type descriptors, element tags, errors, collaborator traits |
//! | [`heap`] | `tessera-heap` | Segmented heap, card table, thread modes, array views |
//! | [`registry`] | `tessera-types` | Type registry and array-type cache |
//! | [`array`] | `tessera-array` | Element validation, dispatch, bounds encoding, runtime |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`tessera-core`).
///
/// Contains [`types::TypeDescriptor`], [`types::CorElementType`], the
/// error types, and the collaborator traits ([`types::TypeLoader`],
/// [`types::ArrayAllocator`], [`types::CooperativeMode`]).
pub use tessera_core as types;

/// Managed heap (`tessera-heap`).
///
/// [`heap::ManagedHeap`] allocates array objects in segments and tracks
/// reference stores in a [`heap::CardTable`].
pub use tessera_heap as heap;

/// Type registry (`tessera-types`).
pub use tessera_types as registry;

/// Array creation (`tessera-array`).
///
/// [`array::ArrayFactory`] works against any collaborators;
/// [`array::ArrayRuntime`] wires the production ones together.
pub use tessera_array as array;

/// Common imports for typical Tessera usage.
pub mod prelude {
    // Core types and traits
    pub use tessera_core::{
        ArrayRef, ArrayShape, ConcreteType, CorElementType, EntryPoint, TypeHandle, TypeId,
        TypeLoader,
    };

    // Errors
    pub use tessera_core::{ArrayError, NotSupportedReason};

    // Heap
    pub use tessera_heap::{ArrayView, HeapConfig, ManagedHeap};

    // Registry
    pub use tessera_types::TypeRegistry;

    // Array creation
    pub use tessera_array::{ArrayFactory, ArrayRequest, ArrayRuntime, RuntimeConfig};
}
