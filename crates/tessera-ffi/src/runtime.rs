//! Runtime lifecycle and type registration FFI.

use std::ffi::{c_char, CStr};
use std::sync::{Arc, Mutex};

use tessera_array::{ArrayRuntime, RuntimeConfig};
use tessera_core::{ArrayShape, ConcreteType, CorElementType, EntryPoint, TypeHandle, TypeId, TypeLoader};
use tessera_heap::HeapConfig;

use crate::handle::HandleTable;
use crate::status::TesseraStatus;

static RUNTIMES: Mutex<HandleTable<Arc<ArrayRuntime>>> = Mutex::new(HandleTable::new());

/// C mirror of [`RuntimeConfig`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TesseraRuntimeConfig {
    /// Words per regular heap segment. Power of two, at least 1024.
    pub segment_words: u64,
    /// Upper bound on heap bytes reserved across all segments.
    pub max_heap_bytes: u64,
    /// log2 of the card size in bytes.
    pub card_shift: u32,
    /// Largest array rank the runtime accepts.
    pub max_rank: u32,
}

impl Default for TesseraRuntimeConfig {
    fn default() -> Self {
        let config = RuntimeConfig::default();
        Self {
            segment_words: config.heap.segment_words as u64,
            max_heap_bytes: config.heap.max_heap_bytes as u64,
            card_shift: config.heap.card_shift,
            max_rank: config.max_rank,
        }
    }
}

impl TesseraRuntimeConfig {
    fn to_runtime_config(self) -> Option<RuntimeConfig> {
        Some(RuntimeConfig {
            heap: HeapConfig {
                segment_words: usize::try_from(self.segment_words).ok()?,
                max_heap_bytes: usize::try_from(self.max_heap_bytes).ok()?,
                card_shift: self.card_shift,
            },
            max_rank: self.max_rank,
        })
    }
}

/// Clone the runtime behind `handle`, briefly locking the global table.
pub(crate) fn get_runtime(handle: u64) -> Option<Arc<ArrayRuntime>> {
    RUNTIMES.lock().ok()?.get(handle).cloned()
}

/// Resolve a type id against a runtime's registry.
pub(crate) fn lookup_type(runtime: &ArrayRuntime, id: u32) -> Result<TypeHandle, TesseraStatus> {
    runtime
        .registry()
        .get(TypeId(id))
        .ok_or(TesseraStatus::UnknownType)
}

/// Fill `out` with the default runtime configuration.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_runtime_config_default(out: *mut TesseraRuntimeConfig) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = TesseraRuntimeConfig::default() };
        TesseraStatus::Ok as i32
    })
}

/// Create a runtime. `config` may be null to use the defaults.
///
/// On success writes the runtime handle to `runtime_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_runtime_create(
    config: *const TesseraRuntimeConfig,
    runtime_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if runtime_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let config = if config.is_null() {
            TesseraRuntimeConfig::default()
        } else {
            // SAFETY: config is non-null and valid per caller contract.
            unsafe { *config }
        };
        let Some(config) = config.to_runtime_config() else {
            return TesseraStatus::ConfigError as i32;
        };
        let runtime = match ArrayRuntime::new(config) {
            Ok(rt) => rt,
            Err(e) => return TesseraStatus::from(&e) as i32,
        };
        let handle = ffi_lock!(RUNTIMES).insert(Arc::new(runtime));
        // SAFETY: runtime_out is non-null and valid per caller contract.
        unsafe { *runtime_out = handle };
        TesseraStatus::Ok as i32
    })
}

/// Destroy a runtime. Arrays it allocated become invalid.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_runtime_destroy(runtime: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(RUNTIMES).remove(runtime) {
            Some(_) => TesseraStatus::Ok as i32,
            None => TesseraStatus::InvalidHandle as i32,
        }
    })
}

/// Type id of a built-in type, given its element-type code
/// (`ELEMENT_TYPE_I4` = 0x08 and so on).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_builtin_type(runtime: u64, element_type: i32, type_out: *mut u32) -> i32 {
    ffi_guard!({
        if type_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        let Some(ty) = CorElementType::from_raw(element_type).and_then(|k| rt.registry().builtin(k))
        else {
            return TesseraStatus::InvalidArgument as i32;
        };
        // SAFETY: type_out is non-null and valid per caller contract.
        unsafe { *type_out = ty.id().0 };
        TesseraStatus::Ok as i32
    })
}

#[allow(unsafe_code)]
fn read_name(name: *const c_char) -> Option<String> {
    if name.is_null() {
        return None;
    }
    // SAFETY: name is non-null and NUL-terminated per caller contract.
    let name = unsafe { CStr::from_ptr(name) };
    name.to_str().ok().filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Register a reference type named `name` (UTF-8, NUL-terminated).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_type_define_class(
    runtime: u64,
    name: *const c_char,
    type_out: *mut u32,
) -> i32 {
    ffi_guard!({
        if type_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(name) = read_name(name) else {
            return TesseraStatus::InvalidArgument as i32;
        };
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        let ty = rt.registry().define_class(name);
        // SAFETY: type_out is non-null and valid per caller contract.
        unsafe { *type_out = ty.id().0 };
        TesseraStatus::Ok as i32
    })
}

/// Register a value type of `size` bytes. `default_ctor` is the entry
/// point of its parameterless constructor, or 0 if it has none.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_type_define_struct(
    runtime: u64,
    name: *const c_char,
    size: u32,
    default_ctor: usize,
    type_out: *mut u32,
) -> i32 {
    ffi_guard!({
        if type_out.is_null() || size == 0 {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(name) = read_name(name) else {
            return TesseraStatus::InvalidArgument as i32;
        };
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        let mut concrete = ConcreteType::value_type(size);
        if default_ctor != 0 {
            concrete = concrete.with_default_ctor(EntryPoint(default_ctor));
        }
        let ty = rt.registry().define_concrete(name, concrete);
        // SAFETY: type_out is non-null and valid per caller contract.
        unsafe { *type_out = ty.id().0 };
        TesseraStatus::Ok as i32
    })
}

/// Resolve the array type over `element_type`. A nonzero `vector`
/// selects the single-dimension zero-based shape and requires `rank == 1`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_array_type(
    runtime: u64,
    element_type: u32,
    rank: u32,
    vector: u8,
    type_out: *mut u32,
) -> i32 {
    ffi_guard!({
        if type_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        if rank == 0 || rank > rt.registry().max_rank() || (vector != 0 && rank != 1) {
            return TesseraStatus::InvalidArgument as i32;
        }
        let element = match lookup_type(&rt, element_type) {
            Ok(ty) => ty,
            Err(status) => return status as i32,
        };
        let shape = if vector != 0 {
            ArrayShape::Vector
        } else {
            ArrayShape::MultiDim { rank }
        };
        match rt.array_type(&element, shape) {
            Ok(ty) => {
                // SAFETY: type_out is non-null and valid per caller contract.
                unsafe { *type_out = ty.id().0 };
                TesseraStatus::Ok as i32
            }
            Err(e) => TesseraStatus::from(&e) as i32,
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn create_default() -> u64 {
        let mut handle = 0;
        assert_eq!(
            tessera_runtime_create(std::ptr::null(), &mut handle),
            TesseraStatus::Ok as i32
        );
        handle
    }

    #[test]
    fn create_and_destroy() {
        let h = create_default();
        assert!(get_runtime(h).is_some());
        assert_eq!(tessera_runtime_destroy(h), TesseraStatus::Ok as i32);
        assert_eq!(tessera_runtime_destroy(h), TesseraStatus::InvalidHandle as i32);
        assert!(get_runtime(h).is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = TesseraRuntimeConfig::default();
        assert_eq!(tessera_runtime_config_default(&mut config), TesseraStatus::Ok as i32);
        config.segment_words = 1000;
        let mut handle = 0;
        assert_eq!(
            tessera_runtime_create(&config, &mut handle),
            TesseraStatus::ConfigError as i32
        );
        assert_eq!(
            tessera_runtime_create(std::ptr::null(), std::ptr::null_mut()),
            TesseraStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn builtin_and_array_types() {
        let h = create_default();
        let mut int32 = 0;
        assert_eq!(tessera_builtin_type(h, 0x08, &mut int32), TesseraStatus::Ok as i32);
        assert_eq!(
            tessera_builtin_type(h, 0x12, &mut int32),
            TesseraStatus::InvalidArgument as i32
        );

        let (mut vec_a, mut vec_b, mut md) = (0, 0, 0);
        assert_eq!(tessera_array_type(h, int32, 1, 1, &mut vec_a), TesseraStatus::Ok as i32);
        assert_eq!(tessera_array_type(h, int32, 1, 1, &mut vec_b), TesseraStatus::Ok as i32);
        assert_eq!(vec_a, vec_b);
        assert_eq!(tessera_array_type(h, int32, 1, 0, &mut md), TesseraStatus::Ok as i32);
        assert_ne!(md, vec_a);

        assert_eq!(
            tessera_array_type(h, int32, 2, 1, &mut md),
            TesseraStatus::InvalidArgument as i32
        );
        assert_eq!(
            tessera_array_type(h, int32, 33, 0, &mut md),
            TesseraStatus::InvalidArgument as i32
        );
        assert_eq!(
            tessera_array_type(h, 0xdead, 1, 1, &mut md),
            TesseraStatus::UnknownType as i32
        );
        tessera_runtime_destroy(h);
    }

    #[test]
    fn define_types_by_name() {
        let h = create_default();
        let name = c"Widget";
        let mut widget = 0;
        assert_eq!(
            tessera_type_define_class(h, name.as_ptr(), &mut widget),
            TesseraStatus::Ok as i32
        );
        let rt = get_runtime(h).unwrap();
        assert_eq!(lookup_type(&rt, widget).unwrap().name(), "Widget");

        let mut point = 0;
        assert_eq!(
            tessera_type_define_struct(h, c"Point".as_ptr(), 8, 0x40, &mut point),
            TesseraStatus::Ok as i32
        );
        assert_eq!(
            lookup_type(&rt, point).unwrap().default_ctor(),
            Some(EntryPoint(0x40))
        );
        assert_eq!(
            tessera_type_define_class(h, std::ptr::null(), &mut widget),
            TesseraStatus::InvalidArgument as i32
        );
        tessera_runtime_destroy(h);
    }
}
