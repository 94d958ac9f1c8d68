//! C-compatible status codes.
//!
//! [`TesseraStatus`] is a `repr(i32)` enum returned by every FFI entry
//! point. Conversions from [`ArrayError`] and [`ConfigError`] are provided.

use tessera_array::ConfigError;
use tessera_core::{ArrayError, NotSupportedReason};

/// C-compatible status code returned by all FFI functions.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TesseraStatus {
    /// Success.
    Ok = 0,
    /// Handle is invalid or was already destroyed.
    InvalidHandle = -1,
    /// An argument is null, out of range, or otherwise invalid.
    InvalidArgument = -2,
    /// Element type is by-ref-like.
    NotSupportedByRefLike = -3,
    /// Element type contains unbound generic parameters.
    OpenType = -4,
    /// Element type is void.
    VoidArray = -5,
    /// Element type is a by-ref or a generic parameter.
    InvalidElementType = -6,
    /// The heap could not satisfy the allocation.
    OutOfMemory = -7,
    /// Lengths or bounds overflowed the allocation primitive.
    Overflow = -8,
    /// Value-type element has no parameterless constructor.
    MissingMethod = -9,
    /// A type id does not belong to the runtime.
    UnknownType = -10,
    /// Runtime configuration failed validation.
    ConfigError = -11,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -20,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<NotSupportedReason> for TesseraStatus {
    fn from(reason: NotSupportedReason) -> Self {
        match reason {
            NotSupportedReason::ByRefLikeElement => TesseraStatus::NotSupportedByRefLike,
            NotSupportedReason::OpenGenericElement => TesseraStatus::OpenType,
            NotSupportedReason::VoidElement => TesseraStatus::VoidArray,
            NotSupportedReason::InvalidElementKind => TesseraStatus::InvalidElementType,
        }
    }
}

impl From<&ArrayError> for TesseraStatus {
    fn from(e: &ArrayError) -> Self {
        match e {
            ArrayError::NotSupported(reason) => TesseraStatus::from(*reason),
            ArrayError::OutOfMemory { .. } => TesseraStatus::OutOfMemory,
            ArrayError::Overflow { .. } => TesseraStatus::Overflow,
            ArrayError::MissingDefaultConstructor { .. } => TesseraStatus::MissingMethod,
            ArrayError::UnknownType { .. } => TesseraStatus::UnknownType,
        }
    }
}

impl From<&ConfigError> for TesseraStatus {
    fn from(_e: &ConfigError) -> Self {
        TesseraStatus::ConfigError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::TypeId;

    #[test]
    fn status_code_values_are_stable() {
        assert_eq!(TesseraStatus::Ok as i32, 0);
        assert_eq!(TesseraStatus::InvalidHandle as i32, -1);
        assert_eq!(TesseraStatus::InvalidArgument as i32, -2);
        assert_eq!(TesseraStatus::NotSupportedByRefLike as i32, -3);
        assert_eq!(TesseraStatus::OpenType as i32, -4);
        assert_eq!(TesseraStatus::VoidArray as i32, -5);
        assert_eq!(TesseraStatus::InvalidElementType as i32, -6);
        assert_eq!(TesseraStatus::OutOfMemory as i32, -7);
        assert_eq!(TesseraStatus::Overflow as i32, -8);
        assert_eq!(TesseraStatus::MissingMethod as i32, -9);
        assert_eq!(TesseraStatus::UnknownType as i32, -10);
        assert_eq!(TesseraStatus::ConfigError as i32, -11);
        assert_eq!(TesseraStatus::InternalError as i32, -20);
        assert_eq!(TesseraStatus::Panicked as i32, -128);
    }

    #[test]
    fn rejection_reasons_map_to_distinct_codes() {
        let codes = [
            NotSupportedReason::ByRefLikeElement,
            NotSupportedReason::OpenGenericElement,
            NotSupportedReason::VoidElement,
            NotSupportedReason::InvalidElementKind,
        ]
        .map(|r| TesseraStatus::from(&ArrayError::NotSupported(r)) as i32);
        assert_eq!(codes, [-3, -4, -5, -6]);
    }

    #[test]
    fn array_error_to_status() {
        assert_eq!(
            TesseraStatus::from(&ArrayError::OutOfMemory { requested_bytes: 8 }),
            TesseraStatus::OutOfMemory
        );
        assert_eq!(
            TesseraStatus::from(&ArrayError::Overflow { reason: "x".into() }),
            TesseraStatus::Overflow
        );
        assert_eq!(
            TesseraStatus::from(&ArrayError::MissingDefaultConstructor {
                type_name: "Point".into()
            }),
            TesseraStatus::MissingMethod
        );
        assert_eq!(
            TesseraStatus::from(&ArrayError::UnknownType { id: TypeId(7) }),
            TesseraStatus::UnknownType
        );
    }
}
