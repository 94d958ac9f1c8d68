//! Element-type queries on array types and instances.

use tracing::debug;

use tessera_core::{ArrayError, ArrayRef, CorElementType, EntryPoint, TypeHandle};
use tessera_heap::ManagedHeap;
use tessera_types::TypeRegistry;

/// Entry point of the parameterless constructor of `array_type`'s element,
/// used to initialise every slot of a freshly created value-type array.
///
/// Activates the element type's static state in `registry` first time
/// through; later calls find it already active.
///
/// # Errors
///
/// [`ArrayError::MissingDefaultConstructor`] if the element has no
/// parameterless constructor.
pub fn element_constructor_entrypoint(
    registry: &TypeRegistry,
    array_type: &TypeHandle,
) -> Result<EntryPoint, ArrayError> {
    debug_assert!(array_type.is_array(), "{array_type} is not an array type");
    let element = array_type
        .array_element()
        .ok_or_else(|| ArrayError::MissingDefaultConstructor {
            type_name: array_type.name().to_owned(),
        })?;
    debug_assert!(!element.is_type_desc(), "element {element} has no method table");
    let entry = element
        .default_ctor()
        .ok_or_else(|| ArrayError::MissingDefaultConstructor {
            type_name: element.name().to_owned(),
        })?;
    if registry.ensure_statics_active(element.id()) {
        debug!(element = %element, entry = %entry, "element constructor resolved");
    }
    Ok(entry)
}

/// Normalised element tag of an array instance.
///
/// Primitives report themselves, enums their underlying primitive, other
/// value types `ValueType`, reference types `Class`, pointers `Ptr`, and
/// function pointers `FnPtr`. Returns `None` if `array` is not an object
/// in `heap`.
pub fn cor_element_type_of_element_type(
    heap: &ManagedHeap,
    array: ArrayRef,
) -> Option<CorElementType> {
    heap.view(array).map(|v| v.element_kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{ArrayShape, ConcreteType, TypeLoader};
    use tessera_heap::HeapConfig;

    fn heap() -> ManagedHeap {
        ManagedHeap::new(HeapConfig {
            segment_words: 4096,
            max_heap_bytes: 1 << 20,
            card_shift: 8,
        })
        .unwrap()
    }

    #[test]
    fn constructor_found_and_statics_activated_once() {
        let registry = TypeRegistry::new();
        let point = registry.define_concrete(
            "Point",
            ConcreteType::value_type(8).with_default_ctor(EntryPoint(0xbeef)),
        );
        let points = registry.load_array_type(&point, ArrayShape::Vector).unwrap();
        assert_eq!(
            element_constructor_entrypoint(&registry, &points),
            Ok(EntryPoint(0xbeef))
        );
        assert!(registry.statics_active(point.id()));
        assert_eq!(
            element_constructor_entrypoint(&registry, &points),
            Ok(EntryPoint(0xbeef))
        );
        assert!(!registry.ensure_statics_active(point.id()));
    }

    #[test]
    fn missing_constructor_is_an_error() {
        let registry = TypeRegistry::new();
        let plain = registry.define_struct("Plain", 4);
        let arr = registry.load_array_type(&plain, ArrayShape::Vector).unwrap();
        assert_eq!(
            element_constructor_entrypoint(&registry, &arr),
            Err(ArrayError::MissingDefaultConstructor {
                type_name: "Plain".into()
            })
        );
        assert!(!registry.statics_active(plain.id()));
    }

    #[test]
    fn element_kind_normalises_element_types() {
        let registry = TypeRegistry::new();
        let heap = heap();
        let color = registry.define_enum("Color", CorElementType::U2);
        let point = registry.define_struct("Point", 8);
        let widget = registry.define_class("Widget");
        let int32 = registry.builtin(CorElementType::I4).unwrap().clone();
        let int_ptr = registry.define_pointer(&int32);
        let fn_ptr = registry.define_function_pointer("delegate*<void>");
        let string = registry.builtin(CorElementType::String).unwrap().clone();
        let widgets = registry.load_array_type(&widget, ArrayShape::Vector).unwrap();

        let cases = [
            (&color, CorElementType::U2),
            (&point, CorElementType::ValueType),
            (&widget, CorElementType::Class),
            (&string, CorElementType::Class),
            (&widgets, CorElementType::Class),
            (&int_ptr, CorElementType::Ptr),
            (&fn_ptr, CorElementType::FnPtr),
        ];
        for (element, expected) in cases {
            let ty = registry.load_array_type(element, ArrayShape::Vector).unwrap();
            let arr = heap.alloc_vector(&ty, 1).unwrap();
            assert_eq!(
                cor_element_type_of_element_type(&heap, arr),
                Some(expected),
                "{element}"
            );
        }
    }

    #[test]
    fn primitive_vectors_report_their_kind() {
        let heap = heap();
        for kind in CorElementType::PRIMITIVES {
            let arr = heap.alloc_primitive_vector(kind, 2).unwrap();
            assert_eq!(cor_element_type_of_element_type(&heap, arr), Some(kind));
        }
    }

    #[test]
    fn foreign_reference_reports_none() {
        let heap = heap();
        let bogus = ArrayRef::from_addr(0x40).unwrap();
        assert_eq!(cor_element_type_of_element_type(&heap, bogus), None);
    }
}
