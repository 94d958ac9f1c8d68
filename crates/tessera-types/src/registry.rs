//! Thread-safe type registry with a memoized array-type cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::{DashMap, DashSet};
use tracing::{debug, trace};

use tessera_core::{
    ArrayError, ArrayShape, ArrayType, ConcreteType, CorElementType, GenericOwner,
    GenericParameter, TypeDescriptor, TypeHandle, TypeId, TypeKind, TypeLoader, MAX_RANK,
};

/// Display names of the built-in types.
const BUILTIN_NAMES: [(CorElementType, &str); 17] = [
    (CorElementType::Boolean, "Boolean"),
    (CorElementType::Char, "Char"),
    (CorElementType::I1, "SByte"),
    (CorElementType::U1, "Byte"),
    (CorElementType::I2, "Int16"),
    (CorElementType::U2, "UInt16"),
    (CorElementType::I4, "Int32"),
    (CorElementType::U4, "UInt32"),
    (CorElementType::I8, "Int64"),
    (CorElementType::U8, "UInt64"),
    (CorElementType::R4, "Single"),
    (CorElementType::R8, "Double"),
    (CorElementType::I, "IntPtr"),
    (CorElementType::U, "UIntPtr"),
    (CorElementType::Void, "Void"),
    (CorElementType::String, "String"),
    (CorElementType::Object, "Object"),
];

/// Storage for every runtime type of one runtime instance.
///
/// Uses `DashMap` for concurrent access: definitions, lookups, and array
/// type resolution may all happen from any thread. Array types are
/// memoized per `(element, shape)`; the first thread to resolve a pair
/// materializes the descriptor and every later caller receives the same
/// [`TypeHandle`].
///
/// ## Usage
///
/// ```
/// use tessera_core::{ArrayShape, CorElementType, TypeLoader};
/// use tessera_types::TypeRegistry;
///
/// let registry = TypeRegistry::new();
/// let int32 = registry.builtin(CorElementType::I4).unwrap().clone();
/// let a = registry.load_array_type(&int32, ArrayShape::Vector).unwrap();
/// let b = registry.load_array_type(&int32, ArrayShape::Vector).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "Int32[]");
/// ```
pub struct TypeRegistry {
    types: DashMap<TypeId, TypeHandle>,
    builtins: HashMap<CorElementType, TypeHandle>,
    arrays: DashMap<(TypeId, ArrayShape), TypeHandle>,
    active_statics: DashSet<TypeId>,
    next_id: AtomicU32,
    max_rank: u32,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// First id handed to a user-defined type; ids below are built-ins.
    pub const FIRST_USER_ID: u32 = 0x100;

    /// Create a registry holding only the built-in types.
    pub fn new() -> Self {
        Self::with_max_rank(MAX_RANK as u32)
    }

    /// Create a registry that rejects array ranks above `max_rank`.
    ///
    /// # Panics
    ///
    /// Panics if `max_rank` is zero or above [`MAX_RANK`].
    pub fn with_max_rank(max_rank: u32) -> Self {
        assert!(
            (1..=MAX_RANK as u32).contains(&max_rank),
            "max_rank {max_rank} outside 1..={MAX_RANK}"
        );
        let types = DashMap::new();
        let mut builtins = HashMap::with_capacity(BUILTIN_NAMES.len());
        for (kind, name) in BUILTIN_NAMES {
            let id = TypeId(kind as u32);
            let handle = TypeDescriptor::new(id, name, TypeKind::Concrete(ConcreteType::builtin(kind)))
                .into_handle();
            types.insert(id, handle.clone());
            builtins.insert(kind, handle);
        }
        trace!(builtins = builtins.len(), max_rank, "type registry created");
        Self {
            types,
            builtins,
            arrays: DashMap::new(),
            active_statics: DashSet::new(),
            next_id: AtomicU32::new(Self::FIRST_USER_ID),
            max_rank,
        }
    }

    fn allocate_id(&self) -> TypeId {
        TypeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a descriptor of any kind under a fresh id.
    pub fn define(&self, name: impl Into<String>, kind: TypeKind) -> TypeHandle {
        let id = self.allocate_id();
        let handle = TypeDescriptor::new(id, name, kind).into_handle();
        trace!(type_id = %id, type_name = %handle.name(), "type defined");
        self.types.insert(id, handle.clone());
        handle
    }

    /// Register a concrete type.
    pub fn define_concrete(&self, name: impl Into<String>, concrete: ConcreteType) -> TypeHandle {
        self.define(name, TypeKind::Concrete(concrete))
    }

    /// Register a reference type without a parameterless constructor.
    pub fn define_class(&self, name: impl Into<String>) -> TypeHandle {
        self.define_concrete(name, ConcreteType::class())
    }

    /// Register a value type of `size` bytes.
    pub fn define_struct(&self, name: impl Into<String>, size: u32) -> TypeHandle {
        self.define_concrete(name, ConcreteType::value_type(size))
    }

    /// Register an enum backed by `underlying`.
    pub fn define_enum(&self, name: impl Into<String>, underlying: CorElementType) -> TypeHandle {
        debug_assert!(underlying.is_primitive(), "enum over non-primitive {underlying}");
        self.define_concrete(name, ConcreteType::enumeration(underlying))
    }

    /// Register a by-reference type to `target`.
    pub fn define_by_ref(&self, target: &TypeHandle) -> TypeHandle {
        self.define(format!("{}&", target.name()), TypeKind::ByRef(target.clone()))
    }

    /// Register an unmanaged pointer type to `target`.
    pub fn define_pointer(&self, target: &TypeHandle) -> TypeHandle {
        self.define(format!("{}*", target.name()), TypeKind::Pointer(target.clone()))
    }

    /// Register a function-pointer type.
    pub fn define_function_pointer(&self, name: impl Into<String>) -> TypeHandle {
        self.define(name, TypeKind::FunctionPointer)
    }

    /// Register an unbound generic parameter.
    pub fn define_generic_parameter(
        &self,
        name: impl Into<String>,
        index: u32,
        owner: GenericOwner,
    ) -> TypeHandle {
        self.define(
            name,
            TypeKind::GenericParameter(GenericParameter { index, owner }),
        )
    }

    /// Look up a type by id.
    pub fn get(&self, id: TypeId) -> Option<TypeHandle> {
        self.types.get(&id).map(|r| r.clone())
    }

    /// Whether `handle` was created by this registry.
    pub fn owns(&self, handle: &TypeHandle) -> bool {
        self.types
            .get(&handle.id())
            .is_some_and(|r| TypeHandle::ptr_eq(&r, handle))
    }

    /// Built-in type for a primitive kind or `Void`/`String`/`Object`.
    pub fn builtin(&self, kind: CorElementType) -> Option<&TypeHandle> {
        self.builtins.get(&kind)
    }

    /// Array type already cached for `(element, shape)`, without creating it.
    pub fn cached_array_type(&self, element: &TypeHandle, shape: ArrayShape) -> Option<TypeHandle> {
        self.arrays.get(&(element.id(), shape)).map(|r| r.clone())
    }

    /// Number of registered types, arrays included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty. Never true: built-ins are always
    /// registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of materialized array types.
    pub fn array_type_count(&self) -> usize {
        self.arrays.len()
    }

    /// Mark the static state of `id` as initialized.
    ///
    /// Returns `true` only for the call that performed the activation.
    pub fn ensure_statics_active(&self, id: TypeId) -> bool {
        let activated = self.active_statics.insert(id);
        if activated {
            debug!(type_id = %id, "statics activated");
        }
        activated
    }

    /// Whether the static state of `id` has been activated.
    pub fn statics_active(&self, id: TypeId) -> bool {
        self.active_statics.contains(&id)
    }
}

impl TypeLoader for TypeRegistry {
    fn load_array_type(
        &self,
        element: &TypeHandle,
        shape: ArrayShape,
    ) -> Result<TypeHandle, ArrayError> {
        let rank = shape.rank();
        assert!(
            rank >= 1 && rank <= self.max_rank,
            "array rank {rank} outside 1..={}",
            self.max_rank
        );
        if !self.owns(element) {
            return Err(ArrayError::UnknownType { id: element.id() });
        }
        if let Some(cached) = self.arrays.get(&(element.id(), shape)) {
            return Ok(cached.clone());
        }
        let handle = self
            .arrays
            .entry((element.id(), shape))
            .or_insert_with(|| {
                let handle = self.define(
                    format!("{}{}", element.name(), shape),
                    TypeKind::Array(ArrayType {
                        element: element.clone(),
                        shape,
                    }),
                );
                debug!(
                    element = %element.name(),
                    rank,
                    vector = shape.is_vector(),
                    type_id = %handle.id(),
                    "array type materialized"
                );
                handle
            })
            .clone();
        Ok(handle)
    }

    fn max_rank(&self) -> u32 {
        self.max_rank
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.len())
            .field("arrays", &self.arrays.len())
            .field("active_statics", &self.active_statics.len())
            .field("max_rank", &self.max_rank)
            .finish()
    }
}
