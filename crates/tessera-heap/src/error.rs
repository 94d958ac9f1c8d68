//! Heap-specific error types.

use std::error::Error;
use std::fmt;

use tessera_core::ArrayError;

/// Errors that can occur during heap operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// The heap limit would be exceeded by this allocation.
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Configured heap limit in bytes.
        capacity: usize,
    },
    /// Configuration failed validation.
    InvalidConfig {
        /// Description of the violated invariant.
        reason: String,
    },
    /// A dimension length was negative.
    NegativeLength {
        /// Zero-based dimension index.
        dimension: usize,
        /// The offending length.
        length: i32,
    },
    /// Element count, byte size, or `lower_bound + length` overflowed.
    Overflow {
        /// Description of the overflowing quantity.
        reason: String,
    },
    /// An address does not point at an object in this heap.
    UnknownObject {
        /// The address that failed to resolve.
        addr: usize,
    },
    /// A reference copy was rejected before touching memory.
    InvalidCopy {
        /// Why the copy was refused.
        reason: String,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "heap capacity exceeded: requested {requested} bytes, capacity {capacity} bytes"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid heap config: {reason}"),
            Self::NegativeLength { dimension, length } => {
                write!(f, "dimension {dimension} has negative length {length}")
            }
            Self::Overflow { reason } => write!(f, "overflow: {reason}"),
            Self::UnknownObject { addr } => write!(f, "no object at {addr:#x}"),
            Self::InvalidCopy { reason } => write!(f, "invalid copy: {reason}"),
        }
    }
}

impl Error for HeapError {}

/// Allocation failures surface to array-creation callers as
/// [`ArrayError::OutOfMemory`] or [`ArrayError::Overflow`].
impl From<HeapError> for ArrayError {
    fn from(e: HeapError) -> Self {
        match e {
            HeapError::CapacityExceeded { requested, .. } => ArrayError::OutOfMemory {
                requested_bytes: requested,
            },
            other => ArrayError::Overflow {
                reason: other.to_string(),
            },
        }
    }
}
