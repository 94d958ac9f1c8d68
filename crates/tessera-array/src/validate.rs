//! Element-type admissibility checks.

use tessera_core::{NotSupportedReason, TypeDescriptor};

/// Decide whether arrays of `element` may be created.
///
/// Concrete types are rejected when by-ref-like, when they still contain
/// unbound generic parameters, or when they are `Void`, in that order.
/// Among the type-desc forms, by-reference types and free generic
/// parameters are rejected; pointers and function pointers are accepted.
///
/// Pure: touches no shared state and may be called from any thread in any
/// mode.
pub fn check_element_type(element: &TypeDescriptor) -> Result<(), NotSupportedReason> {
    if !element.is_type_desc() {
        if element.is_by_ref_like() {
            return Err(NotSupportedReason::ByRefLikeElement);
        }
        if element.contains_generic_variables() {
            return Err(NotSupportedReason::OpenGenericElement);
        }
        if element.is_void() {
            return Err(NotSupportedReason::VoidElement);
        }
    } else if element.is_by_ref() || element.is_generic_parameter() {
        return Err(NotSupportedReason::InvalidElementKind);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{CorElementType, GenericOwner, TypeLoader};
    use tessera_types::TypeRegistry;

    #[test]
    fn plain_types_are_accepted() {
        let registry = TypeRegistry::new();
        let int32 = registry.builtin(CorElementType::I4).unwrap().clone();
        assert_eq!(check_element_type(&int32), Ok(()));
        assert_eq!(check_element_type(&registry.define_class("Widget")), Ok(()));
        assert_eq!(check_element_type(&registry.define_struct("Point", 8)), Ok(()));
        assert_eq!(
            check_element_type(&registry.define_enum("Color", CorElementType::U1)),
            Ok(())
        );
    }

    #[test]
    fn by_ref_like_is_rejected() {
        let registry = TypeRegistry::new();
        let span = registry.define_concrete(
            "Span`1",
            tessera_core::ConcreteType::value_type(16).by_ref_like(),
        );
        assert_eq!(
            check_element_type(&span),
            Err(NotSupportedReason::ByRefLikeElement)
        );
    }

    #[test]
    fn by_ref_like_wins_over_open_generic() {
        let registry = TypeRegistry::new();
        let open_span = registry.define_concrete(
            "Span`1",
            tessera_core::ConcreteType::value_type(16)
                .by_ref_like()
                .open_generic(),
        );
        assert_eq!(
            check_element_type(&open_span),
            Err(NotSupportedReason::ByRefLikeElement)
        );
    }

    #[test]
    fn open_generic_is_rejected() {
        let registry = TypeRegistry::new();
        let list = registry.define_concrete(
            "List`1",
            tessera_core::ConcreteType::class().open_generic(),
        );
        assert_eq!(
            check_element_type(&list),
            Err(NotSupportedReason::OpenGenericElement)
        );
    }

    #[test]
    fn array_of_open_generic_is_rejected() {
        let registry = TypeRegistry::new();
        let list = registry.define_concrete(
            "List`1",
            tessera_core::ConcreteType::class().open_generic(),
        );
        let arr = registry
            .load_array_type(&list, tessera_core::ArrayShape::Vector)
            .unwrap();
        assert_eq!(
            check_element_type(&arr),
            Err(NotSupportedReason::OpenGenericElement)
        );
    }

    #[test]
    fn void_is_rejected() {
        let registry = TypeRegistry::new();
        let void = registry.builtin(CorElementType::Void).unwrap();
        assert_eq!(
            check_element_type(void),
            Err(NotSupportedReason::VoidElement)
        );
    }

    #[test]
    fn by_ref_and_generic_parameters_are_rejected() {
        let registry = TypeRegistry::new();
        let int32 = registry.builtin(CorElementType::I4).unwrap().clone();
        let by_ref = registry.define_by_ref(&int32);
        let t = registry.define_generic_parameter("T", 0, GenericOwner::Type);
        let m = registry.define_generic_parameter("M", 0, GenericOwner::Method);
        for ty in [by_ref, t, m] {
            assert_eq!(
                check_element_type(&ty),
                Err(NotSupportedReason::InvalidElementKind),
                "{ty}"
            );
        }
    }

    #[test]
    fn pointers_are_accepted() {
        let registry = TypeRegistry::new();
        let int32 = registry.builtin(CorElementType::I4).unwrap().clone();
        assert_eq!(check_element_type(&registry.define_pointer(&int32)), Ok(()));
        assert_eq!(
            check_element_type(&registry.define_function_pointer("delegate*<void>")),
            Ok(())
        );
    }
}
