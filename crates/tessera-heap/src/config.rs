//! Heap configuration parameters.

use crate::error::HeapError;

/// Machine word size in bytes.
pub const WORD: usize = std::mem::size_of::<usize>();

/// Configuration for the managed heap.
///
/// Controls segment sizing, the total capacity limit, and card granularity.
/// Validated by [`HeapConfig::validate`]; all values are immutable once the
/// heap is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Size of each regular segment in machine words.
    ///
    /// Default: 1_048_576 (8MB on 64-bit targets).
    /// Must be a power of two and at least 1024. Objects larger than a
    /// segment get a dedicated segment of their own.
    pub segment_words: usize,

    /// Upper bound on the bytes reserved across all segments.
    ///
    /// Default: 1GB. Allocations that would exceed it fail with
    /// [`HeapError::CapacityExceeded`].
    pub max_heap_bytes: usize,

    /// log2 of the card size in bytes.
    ///
    /// Default: 8 (256-byte cards). Must lie between log2 of the word size
    /// and 16.
    pub card_shift: u32,
}

impl HeapConfig {
    /// Default segment size: 1M words.
    pub const DEFAULT_SEGMENT_WORDS: usize = 1 << 20;

    /// Default heap limit: 1GB.
    pub const DEFAULT_MAX_HEAP_BYTES: usize = 1 << 30;

    /// Default card size: 256 bytes.
    pub const DEFAULT_CARD_SHIFT: u32 = 8;

    /// Smallest accepted segment size in words.
    pub const MIN_SEGMENT_WORDS: usize = 1024;

    /// Size of a regular segment in bytes.
    pub fn segment_bytes(&self) -> usize {
        self.segment_words * WORD
    }

    /// Size of one card in bytes.
    pub fn card_bytes(&self) -> usize {
        1 << self.card_shift
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), HeapError> {
        if !self.segment_words.is_power_of_two() || self.segment_words < Self::MIN_SEGMENT_WORDS
        {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "segment_words must be a power of two >= {}, got {}",
                    Self::MIN_SEGMENT_WORDS,
                    self.segment_words
                ),
            });
        }
        let min_shift = WORD.trailing_zeros();
        if self.card_shift < min_shift || self.card_shift > 16 {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "card_shift must be in [{min_shift}, 16], got {}",
                    self.card_shift
                ),
            });
        }
        if self.max_heap_bytes < self.segment_bytes() {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "max_heap_bytes ({}) is smaller than one segment ({} bytes)",
                    self.max_heap_bytes,
                    self.segment_bytes()
                ),
            });
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            segment_words: Self::DEFAULT_SEGMENT_WORDS,
            max_heap_bytes: Self::DEFAULT_MAX_HEAP_BYTES,
            card_shift: Self::DEFAULT_CARD_SHIFT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(HeapConfig::default().validate().is_ok());
    }

    #[test]
    fn default_segment_is_one_mega_word() {
        let config = HeapConfig::default();
        assert_eq!(config.segment_bytes(), (1 << 20) * WORD);
        assert_eq!(config.card_bytes(), 256);
    }

    #[test]
    fn non_power_of_two_segment_rejected() {
        let config = HeapConfig {
            segment_words: 3000,
            ..HeapConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HeapError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn tiny_segment_rejected() {
        let config = HeapConfig {
            segment_words: 512,
            ..HeapConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn card_shift_range_enforced() {
        let too_small = HeapConfig {
            card_shift: 1,
            ..HeapConfig::default()
        };
        let too_large = HeapConfig {
            card_shift: 17,
            ..HeapConfig::default()
        };
        assert!(too_small.validate().is_err());
        assert!(too_large.validate().is_err());
    }

    #[test]
    fn heap_limit_must_hold_one_segment() {
        let config = HeapConfig {
            segment_words: 1024,
            max_heap_bytes: 1024 * WORD - 1,
            card_shift: 8,
        };
        assert!(config.validate().is_err());
    }
}
