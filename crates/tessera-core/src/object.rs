//! References to allocated managed objects.

use std::fmt;
use std::num::NonZeroUsize;

/// Reference to an array object on the managed heap.
///
/// The value is the object's word-aligned heap address. It is what gets
/// stored in reference-typed array slots, so a zero slot means null and a
/// non-zero slot decodes with [`ArrayRef::from_addr`]. Reading the object
/// requires the owning heap.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayRef(NonZeroUsize);

impl ArrayRef {
    /// Decode a heap address. Returns `None` for null.
    pub fn from_addr(addr: usize) -> Option<Self> {
        NonZeroUsize::new(addr).map(Self)
    }

    /// The object's heap address.
    pub fn addr(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayRef({:#x})", self.0)
    }
}

impl fmt::Display for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
