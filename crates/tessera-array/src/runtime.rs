//! A self-contained array runtime: registry, heap, and thread modes.

use tracing::info;

use tessera_core::{
    ArrayError, ArrayRef, ArrayShape, CoopGuard, CorElementType, EntryPoint, TypeHandle,
    TypeLoader,
};
use tessera_heap::{ArrayClass, HeapError, ManagedHeap, ThreadModes};
use tessera_types::TypeRegistry;

use crate::config::{ConfigError, RuntimeConfig};
use crate::dispatch::ArrayFactory;
use crate::element;
use crate::request::ArrayRequest;

/// Owns the production collaborators and exposes the array entry points.
///
/// `ArrayRuntime` is `Send + Sync`; share it behind an `Arc` to create
/// arrays from many threads.
pub struct ArrayRuntime {
    config: RuntimeConfig,
    registry: TypeRegistry,
    heap: ManagedHeap,
    modes: ThreadModes,
}

impl ArrayRuntime {
    /// Build a runtime from a validated configuration.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let heap = ManagedHeap::new(config.heap.clone())?;
        let registry = TypeRegistry::with_max_rank(config.max_rank);
        info!(
            max_rank = config.max_rank,
            segment_words = config.heap.segment_words,
            "array runtime created"
        );
        Ok(Self {
            config,
            registry,
            heap,
            modes: ThreadModes::new(),
        })
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The managed heap.
    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    /// The cooperative-mode tracker.
    pub fn modes(&self) -> &ThreadModes {
        &self.modes
    }

    /// Enter cooperative mode on the calling thread.
    pub fn coop(&self) -> CoopGuard<'_> {
        CoopGuard::enter(&self.modes)
    }

    /// A factory bound to this runtime's collaborators.
    pub fn factory(&self) -> ArrayFactory<'_> {
        ArrayFactory::new(&self.registry, &self.heap, &self.modes)
    }

    /// See [`ArrayFactory::create_instance`].
    pub fn create_instance(&self, request: &ArrayRequest<'_>) -> Result<ArrayRef, ArrayError> {
        self.factory().create_instance(request)
    }

    /// See [`ArrayFactory::create_instance_md`].
    pub fn create_instance_md(
        &self,
        array_type: &TypeHandle,
        packed_args: &[i32],
    ) -> Result<ArrayRef, ArrayError> {
        self.factory().create_instance_md(array_type, packed_args)
    }

    /// Resolve the canonical array type of `element` with `shape`.
    pub fn array_type(&self, element: &TypeHandle, shape: ArrayShape) -> Result<TypeHandle, ArrayError> {
        self.registry.load_array_type(element, shape)
    }

    /// See [`element::element_constructor_entrypoint`].
    pub fn element_constructor_entrypoint(
        &self,
        array_type: &TypeHandle,
    ) -> Result<EntryPoint, ArrayError> {
        element::element_constructor_entrypoint(&self.registry, array_type)
    }

    /// See [`element::cor_element_type_of_element_type`].
    pub fn cor_element_type_of_element_type(&self, array: ArrayRef) -> Option<CorElementType> {
        element::cor_element_type_of_element_type(&self.heap, array)
    }

    /// Exact array type of an instance. Primitive vectors, which carry no
    /// type handle in their header, resolve to the registry's `T[]`.
    pub fn array_type_of(&self, array: ArrayRef) -> Option<TypeHandle> {
        let view = self.heap.view(array)?;
        match view.class() {
            ArrayClass::Typed(ty) => Some(ty.clone()),
            ArrayClass::Primitive(kind) => {
                let element = self.registry.builtin(*kind)?;
                self.registry
                    .load_array_type(element, ArrayShape::Vector)
                    .ok()
            }
        }
    }

    /// Copy references between arrays under cooperative mode. See
    /// [`ManagedHeap::copy_references`].
    pub fn copy_references(
        &self,
        src: ArrayRef,
        src_index: usize,
        dest: ArrayRef,
        dest_index: usize,
        count: usize,
    ) -> Result<(), HeapError> {
        let coop = self.coop();
        self.heap
            .copy_references(&coop, src, src_index, dest, dest_index, count)
    }

    /// Move reference-bearing memory under cooperative mode and mark the
    /// destination cards.
    ///
    /// # Safety
    ///
    /// Same contract as [`tessera_heap::memmove_gc_refs`].
    #[allow(unsafe_code)]
    pub unsafe fn memmove_gc_refs(&self, dest: *mut u8, src: *const u8, len: usize) {
        let coop = self.coop();
        // SAFETY: forwarded from the caller.
        unsafe { self.heap.memmove_gc_refs(&coop, dest, src, len) }
    }
}

impl std::fmt::Debug for ArrayRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayRuntime")
            .field("registry", &self.registry)
            .field("heap", &self.heap)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_heap::HeapConfig;

    fn runtime() -> ArrayRuntime {
        ArrayRuntime::new(RuntimeConfig {
            heap: HeapConfig {
                segment_words: 4096,
                max_heap_bytes: 1 << 22,
                card_shift: 8,
            },
            max_rank: 8,
        })
        .unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = ArrayRuntime::new(RuntimeConfig {
            max_rank: 0,
            ..RuntimeConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidMaxRank { configured: 0 });
    }

    #[test]
    fn registry_honours_configured_max_rank() {
        let rt = runtime();
        assert_eq!(rt.registry().max_rank(), 8);
    }

    #[test]
    fn primitive_vector_type_resolves_through_registry() {
        let rt = runtime();
        let int32 = rt.registry().builtin(CorElementType::I4).unwrap().clone();
        let arr = rt
            .create_instance(&ArrayRequest::from_element_type(&int32, &[3]))
            .unwrap();
        let ty = rt.array_type_of(arr).unwrap();
        assert_eq!(ty, rt.array_type(&int32, ArrayShape::Vector).unwrap());
        assert_eq!(ty.name(), "Int32[]");
    }

    #[test]
    fn copy_references_enters_and_leaves_cooperative_mode() {
        let rt = runtime();
        let widget = rt.registry().define_class("Widget");
        let widgets = rt.array_type(&widget, ArrayShape::Vector).unwrap();
        let a = rt.create_instance_md(&widgets, &[2]).unwrap();
        let b = rt.create_instance_md(&widgets, &[2]).unwrap();
        {
            let coop = rt.coop();
            rt.heap().set_reference(&coop, a, 0, Some(b)).unwrap();
        }
        rt.copy_references(a, 0, b, 1, 1).unwrap();
        assert_eq!(rt.heap().view(b).unwrap().reference_at(1), Some(b));
        assert_eq!(rt.modes().cooperative_threads(), 0);
    }

    #[test]
    #[allow(unsafe_code)]
    fn runtime_memmove_marks_heap_cards() {
        let rt = runtime();
        let objects = rt
            .array_type(
                rt.registry().builtin(CorElementType::Object).unwrap(),
                ArrayShape::Vector,
            )
            .unwrap();
        let arr = rt.create_instance_md(&objects, &[8]).unwrap();
        let view = rt.heap().view(arr).unwrap();
        rt.heap().clear_cards();
        let base = view.data_words().as_ptr().cast_mut().cast::<u8>();
        unsafe { rt.memmove_gc_refs(base.add(8), base, 16) };
        assert!(rt.heap().is_card_marked(view.data_addr() + 8));
        assert!(!rt.modes().is_cooperative());
    }

    // Compile-time assertion: ArrayRuntime is shareable across threads.
    const _: fn() = || {
        fn assert<T: Send + Sync>() {}
        assert::<ArrayRuntime>();
    };
}
