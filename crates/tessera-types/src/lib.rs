//! Type registry for the Tessera array runtime.
//!
//! [`TypeRegistry`] owns every runtime type descriptor of one runtime
//! instance, resolves array types through a concurrent memoized cache, and
//! records which types have had their static state activated. It is the
//! production implementation of [`tessera_core::TypeLoader`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod registry;

pub use registry::TypeRegistry;
