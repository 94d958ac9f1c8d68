//! Runtime type descriptors.
//!
//! A [`TypeDescriptor`] is a tagged variant over the kinds of type the
//! runtime knows about. Capability queries (`is_by_ref_like`,
//! `contains_generic_variables`, ...) dispatch on the tag; there is no open
//! class hierarchy. Descriptors are immutable once built and are shared as
//! [`TypeHandle`]s, whose equality is pointer identity so that two handles
//! are equal only when they name the same canonical descriptor.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::element::CorElementType;
use crate::id::{EntryPoint, TypeId};

/// Physical representation of an array type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayShape {
    /// Compact rank-1, zero-lower-bound layout.
    Vector,
    /// General layout carrying per-dimension lengths and lower bounds.
    MultiDim {
        /// Number of dimensions. Rank-1 general arrays are legal and are
        /// used for non-zero lower bounds.
        rank: u32,
    },
}

impl ArrayShape {
    /// Number of dimensions.
    pub fn rank(self) -> u32 {
        match self {
            Self::Vector => 1,
            Self::MultiDim { rank } => rank,
        }
    }

    /// Whether this is the compact vector representation.
    pub fn is_vector(self) -> bool {
        matches!(self, Self::Vector)
    }
}

impl fmt::Display for ArrayShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector => write!(f, "[]"),
            Self::MultiDim { rank: 1 } => write!(f, "[*]"),
            Self::MultiDim { rank } => {
                write!(f, "[")?;
                for _ in 1..*rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A type with its own method table: classes, structs, enums, primitives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcreteType {
    /// Signature element type (`Class`, `ValueType`, a primitive, ...).
    pub element_type: CorElementType,
    /// Underlying primitive for enums.
    pub underlying: Option<CorElementType>,
    /// Inline size in bytes for value types; ignored for reference types.
    pub instance_size: u32,
    /// Stack-only value type that array storage cannot hold.
    pub by_ref_like: bool,
    /// Still mentions unbound generic parameters.
    pub generic_variables: bool,
    /// Parameterless instance constructor, if the type has one.
    pub default_ctor: Option<EntryPoint>,
}

impl ConcreteType {
    /// A reference type with no generic variables.
    pub fn class() -> Self {
        Self::with_element_type(CorElementType::Class, 0)
    }

    /// A value type occupying `instance_size` bytes inline.
    pub fn value_type(instance_size: u32) -> Self {
        Self::with_element_type(CorElementType::ValueType, instance_size)
    }

    /// One of the built-in primitive (or `Void`/`String`/`Object`) types.
    pub fn builtin(kind: CorElementType) -> Self {
        let size = kind.primitive_size().unwrap_or(0) as u32;
        Self::with_element_type(kind, size)
    }

    /// An enum backed by `underlying`.
    pub fn enumeration(underlying: CorElementType) -> Self {
        let size = underlying.primitive_size().unwrap_or(0) as u32;
        Self {
            underlying: Some(underlying),
            ..Self::with_element_type(CorElementType::ValueType, size)
        }
    }

    fn with_element_type(element_type: CorElementType, instance_size: u32) -> Self {
        Self {
            element_type,
            underlying: None,
            instance_size,
            by_ref_like: false,
            generic_variables: false,
            default_ctor: None,
        }
    }

    /// Mark as a by-ref-like (stack-only) value type.
    pub fn by_ref_like(mut self) -> Self {
        self.by_ref_like = true;
        self
    }

    /// Mark as containing unbound generic parameters.
    pub fn open_generic(mut self) -> Self {
        self.generic_variables = true;
        self
    }

    /// Attach a parameterless constructor.
    pub fn with_default_ctor(mut self, entry: EntryPoint) -> Self {
        self.default_ctor = Some(entry);
        self
    }
}

/// An array type: element plus shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayType {
    /// Element type.
    pub element: TypeHandle,
    /// Physical representation.
    pub shape: ArrayShape,
}

/// Who declared a generic parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    /// Declared on a type (`!0`).
    Type,
    /// Declared on a method (`!!0`).
    Method,
}

/// A free generic parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GenericParameter {
    /// Position in the owner's parameter list.
    pub index: u32,
    /// Declaring entity.
    pub owner: GenericOwner,
}

/// The kinds of runtime type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// A type with a method table.
    Concrete(ConcreteType),
    /// An array type (also method-table backed).
    Array(ArrayType),
    /// Managed reference to a variable of the inner type.
    ByRef(TypeHandle),
    /// Unmanaged pointer to the inner type.
    Pointer(TypeHandle),
    /// Function pointer.
    FunctionPointer,
    /// Unbound generic parameter.
    GenericParameter(GenericParameter),
}

/// Immutable description of one runtime type.
#[derive(Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    id: TypeId,
    name: String,
    kind: TypeKind,
}

impl TypeDescriptor {
    /// Build a descriptor. Registries are the only intended callers.
    pub fn new(id: TypeId, name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    /// Wrap in a shareable handle.
    pub fn into_handle(self) -> TypeHandle {
        TypeHandle(Arc::new(self))
    }

    /// Registry-assigned id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tagged kind.
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// The concrete payload, for method-table types that are not arrays.
    pub fn as_concrete(&self) -> Option<&ConcreteType> {
        match &self.kind {
            TypeKind::Concrete(c) => Some(c),
            _ => None,
        }
    }

    /// Whether the type lacks its own method table (by-ref, pointer,
    /// function pointer, generic parameter).
    pub fn is_type_desc(&self) -> bool {
        !matches!(self.kind, TypeKind::Concrete(_) | TypeKind::Array(_))
    }

    /// Stack-only value type.
    pub fn is_by_ref_like(&self) -> bool {
        matches!(&self.kind, TypeKind::Concrete(c) if c.by_ref_like)
    }

    /// Mentions an unbound generic parameter anywhere in its structure.
    pub fn contains_generic_variables(&self) -> bool {
        match &self.kind {
            TypeKind::Concrete(c) => c.generic_variables,
            TypeKind::Array(a) => a.element.contains_generic_variables(),
            TypeKind::ByRef(inner) | TypeKind::Pointer(inner) => {
                inner.contains_generic_variables()
            }
            TypeKind::FunctionPointer => false,
            TypeKind::GenericParameter(_) => true,
        }
    }

    /// The void pseudo-type.
    pub fn is_void(&self) -> bool {
        matches!(&self.kind, TypeKind::Concrete(c) if c.element_type == CorElementType::Void)
    }

    /// Managed reference type (`T&`).
    pub fn is_by_ref(&self) -> bool {
        matches!(self.kind, TypeKind::ByRef(_))
    }

    /// Free generic parameter.
    pub fn is_generic_parameter(&self) -> bool {
        matches!(self.kind, TypeKind::GenericParameter(_))
    }

    /// Array type of any shape.
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    /// Array payload, if this is an array type.
    pub fn as_array(&self) -> Option<&ArrayType> {
        match &self.kind {
            TypeKind::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Rank of an array type.
    pub fn array_rank(&self) -> Option<u32> {
        self.as_array().map(|a| a.shape.rank())
    }

    /// Shape of an array type.
    pub fn array_shape(&self) -> Option<ArrayShape> {
        self.as_array().map(|a| a.shape)
    }

    /// Array type using the compact vector representation.
    pub fn is_compact_vector(&self) -> bool {
        self.as_array().is_some_and(|a| a.shape.is_vector())
    }

    /// Element type of an array type.
    pub fn array_element(&self) -> Option<&TypeHandle> {
        self.as_array().map(|a| &a.element)
    }

    /// Tag used in signatures for this type.
    pub fn signature_element_type(&self) -> CorElementType {
        match &self.kind {
            TypeKind::Concrete(c) => c.element_type,
            TypeKind::Array(a) if a.shape.is_vector() => CorElementType::SzArray,
            TypeKind::Array(_) => CorElementType::Array,
            TypeKind::ByRef(_) => CorElementType::ByRef,
            TypeKind::Pointer(_) => CorElementType::Ptr,
            TypeKind::FunctionPointer => CorElementType::FnPtr,
            TypeKind::GenericParameter(p) => match p.owner {
                GenericOwner::Type => CorElementType::Var,
                GenericOwner::Method => CorElementType::MVar,
            },
        }
    }

    /// Normalised tag used by array copy logic.
    ///
    /// Enums collapse to their underlying primitive, every reference type
    /// reports `Class`.
    pub fn verifier_element_type(&self) -> CorElementType {
        match &self.kind {
            TypeKind::Concrete(c) => {
                if let Some(underlying) = c.underlying {
                    return underlying;
                }
                match c.element_type {
                    k if k.is_primitive() => k,
                    CorElementType::ValueType => CorElementType::ValueType,
                    CorElementType::Void => CorElementType::Void,
                    _ => CorElementType::Class,
                }
            }
            TypeKind::Array(_) => CorElementType::Class,
            _ => self.signature_element_type(),
        }
    }

    /// Bytes one value of this type occupies when stored in an array slot.
    pub fn element_size(&self) -> usize {
        match &self.kind {
            TypeKind::Concrete(c) => match c.element_type {
                k if k.is_primitive() => k.primitive_size().unwrap_or(0),
                CorElementType::ValueType => c.instance_size as usize,
                _ => std::mem::size_of::<usize>(),
            },
            _ => std::mem::size_of::<usize>(),
        }
    }

    /// Parameterless constructor of a concrete type.
    pub fn default_ctor(&self) -> Option<EntryPoint> {
        self.as_concrete().and_then(|c| c.default_ctor)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Shared, identity-compared reference to a [`TypeDescriptor`].
#[derive(Clone)]
pub struct TypeHandle(Arc<TypeDescriptor>);

impl TypeHandle {
    /// Whether two handles name the very same descriptor instance.
    pub fn ptr_eq(a: &TypeHandle, b: &TypeHandle) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for TypeHandle {
    type Target = TypeDescriptor;

    fn deref(&self) -> &TypeDescriptor {
        &self.0
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({}, {})", self.0.id, self.0.name)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}
