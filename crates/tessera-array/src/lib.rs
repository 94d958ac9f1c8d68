//! Array-instance creation for the Tessera managed runtime.
//!
//! Given either an exact array type or an element type plus per-dimension
//! lengths and optional lower bounds, [`ArrayFactory`] validates the
//! element, picks the fastest allocation path, encodes bounds for general
//! arrays, and allocates under cooperative mode. Companion queries resolve
//! an array's element constructor and its normalised element tag.
//!
//! [`ArrayRuntime`] bundles the production collaborators: the
//! [`TypeRegistry`](tessera_types::TypeRegistry), the
//! [`ManagedHeap`](tessera_heap::ManagedHeap), and the
//! [`ThreadModes`](tessera_heap::ThreadModes) tracker.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod bounds;
pub mod config;
pub mod dispatch;
pub mod element;
pub mod request;
pub mod runtime;
pub mod validate;

pub use bounds::{encode_bounds, BoundsBuffer};
pub use config::{ConfigError, RuntimeConfig};
pub use dispatch::ArrayFactory;
pub use element::{cor_element_type_of_element_type, element_constructor_entrypoint};
pub use request::ArrayRequest;
pub use runtime::ArrayRuntime;
pub use validate::check_element_type;
