//! Error types for array creation.
//!
//! Three families reach callers: element-type rejections
//! ([`ArrayError::NotSupported`]), resource exhaustion
//! ([`ArrayError::OutOfMemory`]), and argument overflow detected by the
//! allocation primitive. Contract violations (rank above
//! [`MAX_RANK`](crate::MAX_RANK), mismatched buffer sizes) are not errors:
//! they abort through assertions.

use std::error::Error;
use std::fmt;

use crate::id::TypeId;

/// Why an element type cannot be stored in an array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotSupportedReason {
    /// The element is a stack-only (by-ref-like) value type.
    ByRefLikeElement,
    /// The element still contains unbound generic parameters.
    OpenGenericElement,
    /// The element is the void pseudo-type.
    VoidElement,
    /// The element is a by-reference type or a free generic parameter.
    InvalidElementKind,
}

impl fmt::Display for NotSupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByRefLikeElement => write!(f, "arrays of by-ref-like types are not supported"),
            Self::OpenGenericElement => {
                write!(f, "arrays of open generic types are not supported")
            }
            Self::VoidElement => write!(f, "arrays of void are not supported"),
            Self::InvalidElementKind => {
                write!(f, "by-ref and generic parameter element types are not supported")
            }
        }
    }
}

/// Errors returned by array creation entry points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayError {
    /// The requested element type is not legal for array storage.
    NotSupported(NotSupportedReason),
    /// The heap could not satisfy the allocation.
    OutOfMemory {
        /// Size of the failed request in bytes.
        requested_bytes: usize,
    },
    /// A length was negative, or lengths/bounds overflow the addressable range.
    Overflow {
        /// Description of the offending argument.
        reason: String,
    },
    /// The element type has no parameterless constructor.
    MissingDefaultConstructor {
        /// Name of the element type.
        type_name: String,
    },
    /// No type with this id is registered.
    UnknownType {
        /// The unrecognised id.
        id: TypeId,
    },
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported(reason) => write!(f, "not supported: {reason}"),
            Self::OutOfMemory { requested_bytes } => {
                write!(f, "out of memory: requested {requested_bytes} bytes")
            }
            Self::Overflow { reason } => write!(f, "arithmetic overflow: {reason}"),
            Self::MissingDefaultConstructor { type_name } => {
                write!(f, "type '{type_name}' has no parameterless constructor")
            }
            Self::UnknownType { id } => write!(f, "unknown type id {id}"),
        }
    }
}

impl Error for ArrayError {}

impl From<NotSupportedReason> for ArrayError {
    fn from(reason: NotSupportedReason) -> Self {
        Self::NotSupported(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = ArrayError::from(NotSupportedReason::VoidElement);
        assert_eq!(err.to_string(), "not supported: arrays of void are not supported");
    }

    #[test]
    fn out_of_memory_display() {
        let err = ArrayError::OutOfMemory {
            requested_bytes: 4096,
        };
        assert_eq!(err.to_string(), "out of memory: requested 4096 bytes");
    }

    #[test]
    fn missing_ctor_names_type() {
        let err = ArrayError::MissingDefaultConstructor {
            type_name: "Point".into(),
        };
        assert!(err.to_string().contains("'Point'"));
    }
}
