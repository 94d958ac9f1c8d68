//! Test fixtures and recording collaborators for Tessera development.
//!
//! [`Harness`] wires a [`TypeRegistry`] behind a [`RecordingLoader`] and a
//! [`ManagedHeap`] behind a [`RecordingAllocator`], so tests can assert
//! which allocation path array creation took and whether it ran in
//! cooperative mode.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod recording;

use std::sync::Arc;

use tessera_core::{ArrayShape, TypeHandle, TypeLoader};
use tessera_heap::{HeapConfig, ManagedHeap, ThreadModes};
use tessera_types::TypeRegistry;

pub use fixtures::{SampleTypes, POINT_CTOR};
pub use recording::{AllocCall, FailingAllocator, RecordingAllocator, RecordingLoader};

/// Heap sizing used by [`Harness::new`]: 16K-word segments, 16MB limit.
pub fn test_heap_config() -> HeapConfig {
    HeapConfig {
        segment_words: 16 * 1024,
        max_heap_bytes: 16 << 20,
        card_shift: 8,
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`. Safe to call from every test; only the first call
/// installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Recording collaborators over a fresh registry and heap.
pub struct Harness {
    pub types: SampleTypes,
    pub loader: RecordingLoader,
    pub allocator: RecordingAllocator,
    pub modes: Arc<ThreadModes>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_heap_config(test_heap_config())
    }

    pub fn with_heap_config(config: HeapConfig) -> Self {
        init_tracing();
        let registry = Arc::new(TypeRegistry::new());
        let heap = Arc::new(ManagedHeap::new(config).expect("valid test heap config"));
        let modes = Arc::new(ThreadModes::new());
        Self {
            types: SampleTypes::register(&registry),
            loader: RecordingLoader::new(registry),
            allocator: RecordingAllocator::new(heap, Arc::clone(&modes)),
            modes,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.loader.registry()
    }

    pub fn heap(&self) -> &ManagedHeap {
        self.allocator.heap()
    }

    /// Resolve an array type directly through the registry, bypassing
    /// the recording loader.
    pub fn array_type(&self, element: &TypeHandle, shape: ArrayShape) -> TypeHandle {
        self.registry()
            .load_array_type(element, shape)
            .expect("sample element registered")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
