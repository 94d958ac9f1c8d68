//! End-to-end array creation through `ArrayRuntime`.

use tessera_array::{ArrayFactory, ArrayRequest, ArrayRuntime, RuntimeConfig};
use tessera_core::{ArrayError, ArrayShape, CorElementType, NotSupportedReason, TypeLoader};
use tessera_heap::{HeapConfig, WORD};
use tessera_test_utils::{init_tracing, FailingAllocator, Harness, SampleTypes, POINT_CTOR};

fn runtime() -> ArrayRuntime {
    init_tracing();
    ArrayRuntime::new(RuntimeConfig {
        heap: HeapConfig {
            segment_words: 16 * 1024,
            max_heap_bytes: 16 << 20,
            card_shift: 8,
        },
        ..RuntimeConfig::default()
    })
    .unwrap()
}

#[test]
fn lower_bounds_read_back() {
    let rt = runtime();
    let types = SampleTypes::register(rt.registry());
    let arr = rt
        .create_instance(
            &ArrayRequest::from_element_type(&types.int32, &[2, 2]).with_lower_bounds(&[1, 1]),
        )
        .unwrap();
    let view = rt.heap().view(arr).unwrap();
    assert_eq!(view.rank(), 2);
    assert_eq!(view.lower_bounds(), vec![1, 1]);
    assert_eq!(view.lengths(), vec![2, 2]);
    assert_eq!(view.len(), 4);
    assert_eq!(
        rt.array_type_of(arr).unwrap().name(),
        "Int32[,]"
    );
}

#[test]
fn jagged_md_creation_builds_inner_vectors() {
    let rt = runtime();
    let types = SampleTypes::register(rt.registry());
    let ints = rt.array_type(&types.int32, ArrayShape::Vector).unwrap();
    let jagged = rt.array_type(&ints, ArrayShape::Vector).unwrap();
    let arr = rt.create_instance_md(&jagged, &[2, 3]).unwrap();

    let outer = rt.heap().view(arr).unwrap();
    assert_eq!(outer.len(), 2);
    assert_eq!(rt.cor_element_type_of_element_type(arr), Some(CorElementType::Class));
    for i in 0..2 {
        let inner = outer.reference_at(i).expect("slot filled");
        assert_eq!(rt.heap().view(inner).unwrap().len(), 3);
        assert_eq!(rt.array_type_of(inner), Some(ints.clone()));
    }
}

#[test]
fn md_entry_with_lengths_only_is_zero_based() {
    let rt = runtime();
    let types = SampleTypes::register(rt.registry());
    let int32_2d = rt
        .array_type(&types.int32, ArrayShape::MultiDim { rank: 2 })
        .unwrap();
    let arr = rt.create_instance_md(&int32_2d, &[3, 4]).unwrap();
    let view = rt.heap().view(arr).unwrap();
    assert_eq!(view.rank(), 2);
    assert_eq!(view.lengths(), vec![3, 4]);
    assert_eq!(view.lower_bounds(), vec![0, 0]);
    assert_eq!(view.len(), 12);
    assert_eq!(rt.array_type_of(arr), Some(int32_2d));
    assert_eq!(rt.cor_element_type_of_element_type(arr), Some(CorElementType::I4));
}

#[test]
fn value_type_array_with_constructor() {
    let rt = runtime();
    let types = SampleTypes::register(rt.registry());
    let arr = rt
        .create_instance(&ArrayRequest::from_element_type(&types.point, &[4]))
        .unwrap();
    let ty = rt.array_type_of(arr).unwrap();
    assert_eq!(rt.element_constructor_entrypoint(&ty), Ok(POINT_CTOR));
    assert!(rt.registry().statics_active(types.point.id()));
    let view = rt.heap().view(arr).unwrap();
    assert_eq!(view.data_bytes(), 32);
    assert_eq!(view.element_kind(), CorElementType::ValueType);
}

#[test]
fn heap_exhaustion_surfaces_out_of_memory_and_releases_mode() {
    init_tracing();
    let rt = ArrayRuntime::new(RuntimeConfig {
        heap: HeapConfig {
            segment_words: 1024,
            max_heap_bytes: 2 * 1024 * WORD,
            card_shift: 8,
        },
        ..RuntimeConfig::default()
    })
    .unwrap();
    let int64 = rt.registry().builtin(CorElementType::I8).unwrap().clone();
    let err = rt
        .create_instance(&ArrayRequest::from_element_type(&int64, &[100_000]))
        .unwrap_err();
    assert!(matches!(err, ArrayError::OutOfMemory { .. }));
    assert_eq!(rt.modes().cooperative_threads(), 0);
    assert!(!rt.modes().is_cooperative());
}

#[test]
fn allocator_errors_propagate_unchanged() {
    let h = Harness::new();
    let failing = FailingAllocator::new(ArrayError::OutOfMemory {
        requested_bytes: 4096,
    });
    let factory = ArrayFactory::new(&h.loader, &failing, &*h.modes);
    for lengths in [&[8][..], &[2, 4][..]] {
        let err = factory
            .create_instance(&ArrayRequest::from_element_type(&h.types.widget, lengths))
            .unwrap_err();
        assert_eq!(err, ArrayError::OutOfMemory { requested_bytes: 4096 });
    }
    assert_eq!(failing.call_count(), 2);
    assert_eq!(h.modes.cooperative_threads(), 0);
}

#[test]
fn rejected_requests_leave_heap_untouched() {
    let rt = runtime();
    let types = SampleTypes::register(rt.registry());
    let before = rt.heap().stats();
    let arrays_before = rt.registry().array_type_count();
    let err = rt
        .create_instance(&ArrayRequest::from_element_type(&types.span, &[3, 3]))
        .unwrap_err();
    assert_eq!(err, ArrayError::NotSupported(NotSupportedReason::ByRefLikeElement));
    assert_eq!(rt.heap().stats(), before);
    assert_eq!(rt.registry().array_type_count(), arrays_before);
    assert_eq!(rt.modes().transitions(), 0);
}

#[test]
fn pointer_and_function_pointer_arrays_are_allowed() {
    let rt = runtime();
    let types = SampleTypes::register(rt.registry());
    let ptrs = rt
        .create_instance(&ArrayRequest::from_element_type(&types.int32_ptr, &[2]))
        .unwrap();
    let fns = rt
        .create_instance(&ArrayRequest::from_element_type(&types.fn_ptr, &[2]))
        .unwrap();
    assert_eq!(rt.cor_element_type_of_element_type(ptrs), Some(CorElementType::Ptr));
    assert_eq!(rt.cor_element_type_of_element_type(fns), Some(CorElementType::FnPtr));
}

#[test]
fn enum_arrays_report_underlying_primitive() {
    let rt = runtime();
    let types = SampleTypes::register(rt.registry());
    let arr = rt
        .create_instance(&ArrayRequest::from_element_type(&types.color, &[6]))
        .unwrap();
    assert_eq!(rt.cor_element_type_of_element_type(arr), Some(CorElementType::U2));
    assert_eq!(rt.heap().view(arr).unwrap().data_bytes(), 12);
    assert!(rt
        .registry()
        .cached_array_type(&types.color, ArrayShape::Vector)
        .is_some());
}

#[test]
fn max_rank_general_array() {
    let rt = runtime();
    let types = SampleTypes::register(rt.registry());
    let max = rt.registry().max_rank() as usize;
    let lengths = vec![1; max];
    let lower: Vec<i32> = (0..max as i32).collect();
    let arr = rt
        .create_instance(
            &ArrayRequest::from_element_type(&types.float64, &lengths).with_lower_bounds(&lower),
        )
        .unwrap();
    let view = rt.heap().view(arr).unwrap();
    assert_eq!(view.rank() as usize, max);
    assert_eq!(view.lower_bounds(), lower);
    assert_eq!(view.len(), 1);
}
