//! Collaborators that record how array creation drives them.

use std::sync::{Arc, Mutex};

use tessera_core::{
    ArrayAllocator, ArrayError, ArrayRef, ArrayShape, CoopGuard, CorElementType, TypeHandle,
    TypeId, TypeLoader,
};
use tessera_heap::{ManagedHeap, ThreadModes};
use tessera_types::TypeRegistry;

/// [`TypeLoader`] that records every resolution before delegating to a
/// [`TypeRegistry`].
pub struct RecordingLoader {
    registry: Arc<TypeRegistry>,
    resolved: Mutex<Vec<(TypeId, ArrayShape)>>,
}

impl RecordingLoader {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            resolved: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Every `(element, shape)` resolved so far, in order.
    pub fn resolved(&self) -> Vec<(TypeId, ArrayShape)> {
        self.resolved.lock().unwrap().clone()
    }

    pub fn resolve_count(&self) -> usize {
        self.resolved.lock().unwrap().len()
    }

    pub fn reset(&self) {
        self.resolved.lock().unwrap().clear();
    }
}

impl TypeLoader for RecordingLoader {
    fn load_array_type(
        &self,
        element: &TypeHandle,
        shape: ArrayShape,
    ) -> Result<TypeHandle, ArrayError> {
        self.resolved.lock().unwrap().push((element.id(), shape));
        self.registry.load_array_type(element, shape)
    }

    fn max_rank(&self) -> u32 {
        self.registry.max_rank()
    }
}

/// One call observed by [`RecordingAllocator`]. `cooperative` reports
/// whether the calling thread was in cooperative mode at the time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocCall {
    Vector {
        type_name: String,
        length: i32,
        cooperative: bool,
    },
    Primitive {
        kind: CorElementType,
        length: i32,
        cooperative: bool,
    },
    General {
        type_name: String,
        bounds: Vec<i32>,
        cooperative: bool,
    },
}

/// [`ArrayAllocator`] that records each call before delegating to a
/// [`ManagedHeap`].
pub struct RecordingAllocator {
    heap: Arc<ManagedHeap>,
    modes: Arc<ThreadModes>,
    calls: Mutex<Vec<AllocCall>>,
}

impl RecordingAllocator {
    pub fn new(heap: Arc<ManagedHeap>, modes: Arc<ThreadModes>) -> Self {
        Self {
            heap,
            modes,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    pub fn calls(&self) -> Vec<AllocCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: AllocCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ArrayAllocator for RecordingAllocator {
    fn allocate_vector(
        &self,
        coop: &CoopGuard<'_>,
        array_type: &TypeHandle,
        length: i32,
    ) -> Result<ArrayRef, ArrayError> {
        self.record(AllocCall::Vector {
            type_name: array_type.name().to_owned(),
            length,
            cooperative: self.modes.is_cooperative(),
        });
        self.heap.allocate_vector(coop, array_type, length)
    }

    fn allocate_primitive_vector(
        &self,
        coop: &CoopGuard<'_>,
        kind: CorElementType,
        length: i32,
    ) -> Result<ArrayRef, ArrayError> {
        self.record(AllocCall::Primitive {
            kind,
            length,
            cooperative: self.modes.is_cooperative(),
        });
        self.heap.allocate_primitive_vector(coop, kind, length)
    }

    fn allocate_general(
        &self,
        coop: &CoopGuard<'_>,
        array_type: &TypeHandle,
        bounds: &[i32],
    ) -> Result<ArrayRef, ArrayError> {
        self.record(AllocCall::General {
            type_name: array_type.name().to_owned(),
            bounds: bounds.to_vec(),
            cooperative: self.modes.is_cooperative(),
        });
        self.heap.allocate_general(coop, array_type, bounds)
    }
}

/// [`ArrayAllocator`] that fails every call with a fixed error.
pub struct FailingAllocator {
    error: ArrayError,
    calls: Mutex<usize>,
}

impl FailingAllocator {
    pub fn new(error: ArrayError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn fail(&self) -> Result<ArrayRef, ArrayError> {
        *self.calls.lock().unwrap() += 1;
        Err(self.error.clone())
    }
}

impl ArrayAllocator for FailingAllocator {
    fn allocate_vector(
        &self,
        _coop: &CoopGuard<'_>,
        _array_type: &TypeHandle,
        _length: i32,
    ) -> Result<ArrayRef, ArrayError> {
        self.fail()
    }

    fn allocate_primitive_vector(
        &self,
        _coop: &CoopGuard<'_>,
        _kind: CorElementType,
        _length: i32,
    ) -> Result<ArrayRef, ArrayError> {
        self.fail()
    }

    fn allocate_general(
        &self,
        _coop: &CoopGuard<'_>,
        _array_type: &TypeHandle,
        _bounds: &[i32],
    ) -> Result<ArrayRef, ArrayError> {
        self.fail()
    }
}
