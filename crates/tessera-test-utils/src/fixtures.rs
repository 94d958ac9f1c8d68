//! A small type universe covering every element-type category.

use tessera_core::{ConcreteType, CorElementType, EntryPoint, GenericOwner, TypeHandle};
use tessera_types::TypeRegistry;

/// Entry point given to `Point`'s parameterless constructor.
pub const POINT_CTOR: EntryPoint = EntryPoint(0x7000_0010);

/// Handles to one type of each category, registered in one registry.
#[derive(Clone, Debug)]
pub struct SampleTypes {
    pub int32: TypeHandle,
    pub float64: TypeHandle,
    pub string: TypeHandle,
    pub object: TypeHandle,
    pub void: TypeHandle,
    /// Reference type without a default constructor.
    pub widget: TypeHandle,
    /// 8-byte value type with a default constructor.
    pub point: TypeHandle,
    /// Enum backed by `U2`.
    pub color: TypeHandle,
    /// By-ref-like value type.
    pub span: TypeHandle,
    /// Open generic class.
    pub open_list: TypeHandle,
    pub by_ref_int32: TypeHandle,
    pub int32_ptr: TypeHandle,
    pub fn_ptr: TypeHandle,
    /// Type-level generic parameter `T`.
    pub type_param: TypeHandle,
    /// Method-level generic parameter `M`.
    pub method_param: TypeHandle,
}

impl SampleTypes {
    /// Register the sample types in `registry`.
    pub fn register(registry: &TypeRegistry) -> Self {
        let builtin = |kind| {
            registry
                .builtin(kind)
                .cloned()
                .unwrap_or_else(|| panic!("builtin {kind} missing"))
        };
        let int32 = builtin(CorElementType::I4);
        Self {
            float64: builtin(CorElementType::R8),
            string: builtin(CorElementType::String),
            object: builtin(CorElementType::Object),
            void: builtin(CorElementType::Void),
            widget: registry.define_class("Widget"),
            point: registry.define_concrete(
                "Point",
                ConcreteType::value_type(8).with_default_ctor(POINT_CTOR),
            ),
            color: registry.define_enum("Color", CorElementType::U2),
            span: registry.define_concrete("Span`1", ConcreteType::value_type(16).by_ref_like()),
            open_list: registry.define_concrete("List`1", ConcreteType::class().open_generic()),
            by_ref_int32: registry.define_by_ref(&int32),
            int32_ptr: registry.define_pointer(&int32),
            fn_ptr: registry.define_function_pointer("delegate*<void>"),
            type_param: registry.define_generic_parameter("T", 0, GenericOwner::Type),
            method_param: registry.define_generic_parameter("M", 0, GenericOwner::Method),
            int32,
        }
    }
}
