//! The runtime's primitive-type tag.

use std::fmt;

/// Element-type tag carried by every runtime type.
///
/// Discriminants follow the ECMA-335 signature encoding so values can cross
/// the C boundary unchanged.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CorElementType {
    /// The void pseudo-type.
    Void = 0x01,
    /// `bool`.
    Boolean = 0x02,
    /// UTF-16 code unit.
    Char = 0x03,
    /// Signed 8-bit integer.
    I1 = 0x04,
    /// Unsigned 8-bit integer.
    U1 = 0x05,
    /// Signed 16-bit integer.
    I2 = 0x06,
    /// Unsigned 16-bit integer.
    U2 = 0x07,
    /// Signed 32-bit integer.
    I4 = 0x08,
    /// Unsigned 32-bit integer.
    U4 = 0x09,
    /// Signed 64-bit integer.
    I8 = 0x0a,
    /// Unsigned 64-bit integer.
    U8 = 0x0b,
    /// 32-bit float.
    R4 = 0x0c,
    /// 64-bit float.
    R8 = 0x0d,
    /// The string reference type.
    String = 0x0e,
    /// Unmanaged pointer.
    Ptr = 0x0f,
    /// Managed reference to a variable.
    ByRef = 0x10,
    /// Any other value type.
    ValueType = 0x11,
    /// Any other reference type.
    Class = 0x12,
    /// Type-level generic parameter.
    Var = 0x13,
    /// General (multi-dimensional) array.
    Array = 0x14,
    /// Instantiated generic type.
    GenericInst = 0x15,
    /// Typed reference.
    TypedByRef = 0x16,
    /// Native-sized signed integer.
    I = 0x18,
    /// Native-sized unsigned integer.
    U = 0x19,
    /// Function pointer.
    FnPtr = 0x1b,
    /// The root object type.
    Object = 0x1c,
    /// Compact rank-1 zero-lower-bound array.
    SzArray = 0x1d,
    /// Method-level generic parameter.
    MVar = 0x1e,
}

impl CorElementType {
    /// All tags that [`is_primitive`](Self::is_primitive) accepts.
    pub const PRIMITIVES: [CorElementType; 14] = [
        Self::Boolean,
        Self::Char,
        Self::I1,
        Self::U1,
        Self::I2,
        Self::U2,
        Self::I4,
        Self::U4,
        Self::I8,
        Self::U8,
        Self::R4,
        Self::R8,
        Self::I,
        Self::U,
    ];

    /// Decode a raw tag, returning `None` for unassigned values.
    pub fn from_raw(raw: i32) -> Option<Self> {
        let tag = match raw {
            0x01 => Self::Void,
            0x02 => Self::Boolean,
            0x03 => Self::Char,
            0x04 => Self::I1,
            0x05 => Self::U1,
            0x06 => Self::I2,
            0x07 => Self::U2,
            0x08 => Self::I4,
            0x09 => Self::U4,
            0x0a => Self::I8,
            0x0b => Self::U8,
            0x0c => Self::R4,
            0x0d => Self::R8,
            0x0e => Self::String,
            0x0f => Self::Ptr,
            0x10 => Self::ByRef,
            0x11 => Self::ValueType,
            0x12 => Self::Class,
            0x13 => Self::Var,
            0x14 => Self::Array,
            0x15 => Self::GenericInst,
            0x16 => Self::TypedByRef,
            0x18 => Self::I,
            0x19 => Self::U,
            0x1b => Self::FnPtr,
            0x1c => Self::Object,
            0x1d => Self::SzArray,
            0x1e => Self::MVar,
            _ => return None,
        };
        Some(tag)
    }

    /// Whether arrays of this kind can be allocated as raw primitive
    /// buffers without per-element reference tracking.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Char
                | Self::I1
                | Self::U1
                | Self::I2
                | Self::U2
                | Self::I4
                | Self::U4
                | Self::I8
                | Self::U8
                | Self::R4
                | Self::R8
                | Self::I
                | Self::U
        )
    }

    /// Storage size in bytes for primitive kinds, `None` otherwise.
    pub fn primitive_size(self) -> Option<usize> {
        let size = match self {
            Self::Boolean | Self::I1 | Self::U1 => 1,
            Self::Char | Self::I2 | Self::U2 => 2,
            Self::I4 | Self::U4 | Self::R4 => 4,
            Self::I8 | Self::U8 | Self::R8 => 8,
            Self::I | Self::U => std::mem::size_of::<usize>(),
            _ => return None,
        };
        Some(size)
    }

    /// Whether values of this kind are stored as object references.
    pub fn is_object_reference(self) -> bool {
        matches!(
            self,
            Self::String | Self::Class | Self::Object | Self::Array | Self::SzArray
        )
    }
}

impl fmt::Display for CorElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_are_ecma_encoding() {
        assert_eq!(CorElementType::Void as u8, 0x01);
        assert_eq!(CorElementType::I4 as u8, 0x08);
        assert_eq!(CorElementType::R8 as u8, 0x0d);
        assert_eq!(CorElementType::Class as u8, 0x12);
        assert_eq!(CorElementType::SzArray as u8, 0x1d);
    }

    #[test]
    fn from_raw_round_trips_every_assigned_tag() {
        for raw in 0..=0x20 {
            if let Some(tag) = CorElementType::from_raw(raw) {
                assert_eq!(tag as u8 as i32, raw);
            }
        }
        assert_eq!(CorElementType::from_raw(0x17), None);
        assert_eq!(CorElementType::from_raw(0), None);
        assert_eq!(CorElementType::from_raw(-1), None);
    }

    #[test]
    fn primitives_have_sizes() {
        for kind in CorElementType::PRIMITIVES {
            assert!(kind.is_primitive());
            assert!(kind.primitive_size().is_some(), "{kind} has no size");
        }
    }

    #[test]
    fn non_primitives_are_rejected() {
        for kind in [
            CorElementType::Void,
            CorElementType::String,
            CorElementType::ValueType,
            CorElementType::Class,
            CorElementType::Ptr,
            CorElementType::Object,
        ] {
            assert!(!kind.is_primitive());
            assert_eq!(kind.primitive_size(), None);
        }
    }

    #[test]
    fn native_int_matches_pointer_width() {
        assert_eq!(
            CorElementType::I.primitive_size(),
            Some(std::mem::size_of::<usize>())
        );
    }
}
