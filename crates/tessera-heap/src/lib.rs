//! Segmented managed heap for the Tessera array runtime.
//!
//! Arrays live in zero-initialised word segments that never move. Each
//! segment carries a card table so reference stores and bulk copies can
//! record which regions a collector must rescan. The crate also provides
//! the per-thread cooperative-mode tracker and the word-atomic bulk copy
//! used for reference-bearing memory.
//!
//! # Architecture
//!
//! ```text
//! ManagedHeap
//! ├── SegmentList (Mutex)     bump allocation, growth, heap limit
//! ├── directory (RwLock)      address -> segment lookup for views
//! ├── type table (RwLock)     IndexSet<TypeHandle>, one-word headers
//! └── per-segment CardTable   dirtied by set_reference / memmove_gc_refs
//! ```
//!
//! The heap never collects; objects stay valid until the heap is dropped.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod barrier;
pub mod config;
pub mod error;
pub mod heap;
pub mod modes;
pub mod raw;
pub mod segment;
pub mod view;

pub use barrier::{CardTable, WriteBarrier};
pub use config::{HeapConfig, WORD};
pub use error::HeapError;
pub use heap::{HeapStats, ManagedHeap};
pub use modes::ThreadModes;
pub use raw::memmove_gc_refs;
pub use view::{ArrayClass, ArrayView};
