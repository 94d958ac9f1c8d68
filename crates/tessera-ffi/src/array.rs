//! Array creation and query FFI.
//!
//! Arrays are returned as their heap address (`u64`). Counts and ranks
//! are checked here so malformed C input reports `InvalidArgument`
//! instead of reaching the runtime's assertions.

use std::slice;

use tessera_array::ArrayRequest;
use tessera_core::{ArrayError, ArrayRef, ArrayShape, TypeHandle, TypeLoader};

use crate::runtime::{get_runtime, lookup_type};
use crate::status::TesseraStatus;

/// Borrow `len` entries from a C pointer. Null is accepted only for `len == 0`.
#[allow(unsafe_code)]
fn read_slice<'a>(ptr: *const i32, len: usize) -> Option<&'a [i32]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr.is_null() {
        return None;
    }
    // SAFETY: ptr is non-null and points to `len` readable i32 per caller contract.
    Some(unsafe { slice::from_raw_parts(ptr, len) })
}

/// Whether `n` packed arguments describe an instance of `array_type`.
fn packed_args_fit(array_type: &TypeHandle, n: usize) -> bool {
    match array_type.array_shape() {
        Some(ArrayShape::Vector) => {
            n == 1
                || (n > 1
                    && array_type
                        .array_element()
                        .is_some_and(|e| e.is_array() && packed_args_fit(e, n - 1)))
        }
        Some(ArrayShape::MultiDim { rank }) => n == rank as usize || n == 2 * rank as usize,
        None => false,
    }
}

#[allow(unsafe_code)]
fn write_array(out: *mut u64, result: Result<ArrayRef, ArrayError>) -> i32 {
    match result {
        Ok(array) => {
            // SAFETY: out is non-null and valid per caller contract.
            unsafe { *out = array.addr() as u64 };
            TesseraStatus::Ok as i32
        }
        Err(e) => TesseraStatus::from(&e) as i32,
    }
}

/// Create an array of `element_type` with `rank` dimensions.
///
/// `lengths` holds `rank` entries. `lower_bounds` holds `rank` entries or
/// is null for zero-based dimensions. Writes the array to `array_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_array_create_instance(
    runtime: u64,
    element_type: u32,
    rank: u32,
    lengths: *const i32,
    lower_bounds: *const i32,
    array_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if array_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        if rank == 0 || rank > rt.registry().max_rank() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(lengths) = read_slice(lengths, rank as usize) else {
            return TesseraStatus::InvalidArgument as i32;
        };
        let element = match lookup_type(&rt, element_type) {
            Ok(ty) => ty,
            Err(status) => return status as i32,
        };
        let mut request = ArrayRequest::from_element_type(&element, lengths);
        if !lower_bounds.is_null() {
            let Some(lower) = read_slice(lower_bounds, rank as usize) else {
                return TesseraStatus::InvalidArgument as i32;
            };
            request = request.with_lower_bounds(lower);
        }
        write_array(array_out, rt.create_instance(&request))
    })
}

/// Create an instance of the array type `array_type`.
///
/// `lengths` and `lower_bounds` hold one entry per dimension of the type;
/// `lower_bounds` may be null. Vector types reject nonzero lower bounds.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_array_create_from_type(
    runtime: u64,
    array_type: u32,
    lengths: *const i32,
    lower_bounds: *const i32,
    array_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if array_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        let array_type = match lookup_type(&rt, array_type) {
            Ok(ty) => ty,
            Err(status) => return status as i32,
        };
        let Some(shape) = array_type.array_shape() else {
            return TesseraStatus::InvalidArgument as i32;
        };
        let rank = shape.rank() as usize;
        let Some(lengths) = read_slice(lengths, rank) else {
            return TesseraStatus::InvalidArgument as i32;
        };
        let mut request = ArrayRequest::from_array_type(&array_type, lengths);
        if !lower_bounds.is_null() {
            let Some(lower) = read_slice(lower_bounds, rank) else {
                return TesseraStatus::InvalidArgument as i32;
            };
            if shape.is_vector() && lower[0] != 0 {
                return TesseraStatus::InvalidArgument as i32;
            }
            request = request.with_lower_bounds(lower);
        }
        write_array(array_out, rt.create_instance(&request))
    })
}

/// Create an instance of `array_type` from packed arguments: one length
/// per dimension, interleaved `(lower_bound, length)` pairs, or one length
/// per level of a jagged vector.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_array_create_md(
    runtime: u64,
    array_type: u32,
    args: *const i32,
    n_args: usize,
    array_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if array_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        let array_type = match lookup_type(&rt, array_type) {
            Ok(ty) => ty,
            Err(status) => return status as i32,
        };
        if !packed_args_fit(&array_type, n_args) {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(args) = read_slice(args, n_args) else {
            return TesseraStatus::InvalidArgument as i32;
        };
        write_array(array_out, rt.create_instance_md(&array_type, args))
    })
}

/// Entry point of the element type's parameterless constructor for
/// `array_type`, running the element's static initialization.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_array_element_ctor(
    runtime: u64,
    array_type: u32,
    entry_point_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if entry_point_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        let array_type = match lookup_type(&rt, array_type) {
            Ok(ty) if ty.is_array() => ty,
            Ok(_) => return TesseraStatus::InvalidArgument as i32,
            Err(status) => return status as i32,
        };
        match rt.element_constructor_entrypoint(&array_type) {
            Ok(entry) => {
                // SAFETY: entry_point_out is non-null and valid per caller contract.
                unsafe { *entry_point_out = entry.0 };
                TesseraStatus::Ok as i32
            }
            Err(e) => TesseraStatus::from(&e) as i32,
        }
    })
}

/// Element-type code of an array's elements, as seen by the verifier.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_array_element_cor_type(
    runtime: u64,
    array: u64,
    element_type_out: *mut u8,
) -> i32 {
    ffi_guard!({
        if element_type_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        let kind = usize::try_from(array)
            .ok()
            .and_then(ArrayRef::from_addr)
            .and_then(|a| rt.cor_element_type_of_element_type(a));
        match kind {
            Some(kind) => {
                // SAFETY: element_type_out is non-null and valid per caller contract.
                unsafe { *element_type_out = kind as u8 };
                TesseraStatus::Ok as i32
            }
            None => TesseraStatus::InvalidArgument as i32,
        }
    })
}

/// Total element count of an array.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_array_length(runtime: u64, array: u64, length_out: *mut u64) -> i32 {
    ffi_guard!({
        if length_out.is_null() {
            return TesseraStatus::InvalidArgument as i32;
        }
        let Some(rt) = get_runtime(runtime) else {
            return TesseraStatus::InvalidHandle as i32;
        };
        let view = usize::try_from(array)
            .ok()
            .and_then(ArrayRef::from_addr)
            .and_then(|a| rt.heap().view(a));
        match view {
            Some(view) => {
                // SAFETY: length_out is non-null and valid per caller contract.
                unsafe { *length_out = view.len() as u64 };
                TesseraStatus::Ok as i32
            }
            None => TesseraStatus::InvalidArgument as i32,
        }
    })
}
