//! Array-creation requests.

use tessera_core::TypeHandle;

/// What to allocate: either an exact array type or an element type plus a
/// rank, each with per-dimension lengths and optional lower bounds.
///
/// `lengths.len()` is the rank. When present, `lower_bounds` has the same
/// length.
#[derive(Clone, Copy, Debug)]
pub enum ArrayRequest<'a> {
    /// Allocate an instance of an already-resolved array type.
    FromArrayType {
        /// The array type; its rank must equal `lengths.len()`.
        array_type: &'a TypeHandle,
        /// Per-dimension lengths.
        lengths: &'a [i32],
        /// Per-dimension lower bounds, implicitly zero when absent.
        lower_bounds: Option<&'a [i32]>,
    },
    /// Allocate an array of `element` with `rank` dimensions.
    FromElementType {
        /// Element type, validated before anything is resolved.
        element: &'a TypeHandle,
        /// Number of dimensions.
        rank: u32,
        /// Per-dimension lengths.
        lengths: &'a [i32],
        /// Per-dimension lower bounds, implicitly zero when absent.
        lower_bounds: Option<&'a [i32]>,
    },
}

impl<'a> ArrayRequest<'a> {
    /// Request an instance of `array_type`.
    pub fn from_array_type(array_type: &'a TypeHandle, lengths: &'a [i32]) -> Self {
        Self::FromArrayType {
            array_type,
            lengths,
            lower_bounds: None,
        }
    }

    /// Request an array of `element` whose rank is `lengths.len()`.
    pub fn from_element_type(element: &'a TypeHandle, lengths: &'a [i32]) -> Self {
        Self::FromElementType {
            element,
            rank: lengths.len() as u32,
            lengths,
            lower_bounds: None,
        }
    }

    /// Attach per-dimension lower bounds.
    pub fn with_lower_bounds(self, bounds: &'a [i32]) -> Self {
        match self {
            Self::FromArrayType {
                array_type,
                lengths,
                ..
            } => Self::FromArrayType {
                array_type,
                lengths,
                lower_bounds: Some(bounds),
            },
            Self::FromElementType {
                element,
                rank,
                lengths,
                ..
            } => Self::FromElementType {
                element,
                rank,
                lengths,
                lower_bounds: Some(bounds),
            },
        }
    }

    /// Number of dimensions requested.
    pub fn rank(&self) -> u32 {
        match self {
            Self::FromArrayType { lengths, .. } => lengths.len() as u32,
            Self::FromElementType { rank, .. } => *rank,
        }
    }

    /// Per-dimension lengths.
    pub fn lengths(&self) -> &'a [i32] {
        match self {
            Self::FromArrayType { lengths, .. } | Self::FromElementType { lengths, .. } => lengths,
        }
    }

    /// Per-dimension lower bounds, if any were supplied.
    pub fn lower_bounds(&self) -> Option<&'a [i32]> {
        match self {
            Self::FromArrayType { lower_bounds, .. }
            | Self::FromElementType { lower_bounds, .. } => *lower_bounds,
        }
    }

    /// Rank 1 with no lower bound or a zero lower bound.
    pub fn is_zero_based_rank_one(&self) -> bool {
        self.rank() == 1 && self.lower_bounds().is_none_or(|lb| lb.first() == Some(&0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::CorElementType;
    use tessera_types::TypeRegistry;

    #[test]
    fn element_request_derives_rank_from_lengths() {
        let registry = TypeRegistry::new();
        let int32 = registry.builtin(CorElementType::I4).unwrap();
        let req = ArrayRequest::from_element_type(int32, &[2, 3]);
        assert_eq!(req.rank(), 2);
        assert_eq!(req.lengths(), &[2, 3]);
        assert!(req.lower_bounds().is_none());
    }

    #[test]
    fn zero_based_rank_one_detection() {
        let registry = TypeRegistry::new();
        let int32 = registry.builtin(CorElementType::I4).unwrap();
        assert!(ArrayRequest::from_element_type(int32, &[4]).is_zero_based_rank_one());
        assert!(ArrayRequest::from_element_type(int32, &[4])
            .with_lower_bounds(&[0])
            .is_zero_based_rank_one());
        assert!(!ArrayRequest::from_element_type(int32, &[4])
            .with_lower_bounds(&[1])
            .is_zero_based_rank_one());
        assert!(!ArrayRequest::from_element_type(int32, &[4, 4]).is_zero_based_rank_one());
    }
}
