//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a runtime type within a type registry.
///
/// Ids are assigned sequentially when a descriptor is registered and are
/// never reused for the lifetime of the registry. `TypeId(n)` is the n-th
/// descriptor created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TypeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Callable code address of a method body.
///
/// Opaque to this crate: the value is whatever the host runtime hands out
/// as a multi-callable address for a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryPoint(pub usize);

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
