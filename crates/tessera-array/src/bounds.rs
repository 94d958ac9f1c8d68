//! Encoding of per-dimension lengths and lower bounds.

use std::ops::Deref;

use smallvec::SmallVec;
use tessera_core::MAX_RANK;

/// Encoded bounds for a general array allocation.
///
/// Holds either `rank` lengths or `2 * rank` interleaved
/// `(lower_bound, length)` pairs. Backed by inline storage sized for
/// [`MAX_RANK`], so encoding never touches the heap and the buffer is a
/// private copy the caller cannot mutate afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct BoundsBuffer(SmallVec<[i32; 2 * MAX_RANK]>);

impl BoundsBuffer {
    /// The encoded entries.
    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    /// Whether lower bounds are interleaved with the lengths.
    pub fn has_lower_bounds(&self, rank: usize) -> bool {
        self.0.len() == 2 * rank
    }
}

impl Deref for BoundsBuffer {
    type Target = [i32];

    fn deref(&self) -> &[i32] {
        &self.0
    }
}

impl std::fmt::Debug for BoundsBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Encode `lengths` and optional `lower_bounds` into a [`BoundsBuffer`].
///
/// Without lower bounds the buffer is `[len0, len1, ...]`; with them it is
/// `[lb0, len0, lb1, len1, ...]`.
///
/// # Panics
///
/// Panics if the rank is zero or above [`MAX_RANK`], or if
/// `lower_bounds` has a different length than `lengths`.
pub fn encode_bounds(lengths: &[i32], lower_bounds: Option<&[i32]>) -> BoundsBuffer {
    let rank = lengths.len();
    assert!(
        (1..=MAX_RANK).contains(&rank),
        "rank {rank} outside 1..={MAX_RANK}"
    );
    let mut buf = SmallVec::new();
    match lower_bounds {
        Some(lower) => {
            assert_eq!(
                lower.len(),
                rank,
                "lower bounds count does not match rank"
            );
            for (&lb, &len) in lower.iter().zip(lengths) {
                buf.push(lb);
                buf.push(len);
            }
        }
        None => buf.extend_from_slice(lengths),
    }
    debug_assert!(!buf.spilled());
    BoundsBuffer(buf)
}
