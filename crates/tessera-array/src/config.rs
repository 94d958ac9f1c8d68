//! Runtime configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use tessera_core::MAX_RANK;
use tessera_heap::{HeapConfig, HeapError};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`RuntimeConfig::validate()`].
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Heap configuration is invalid.
    Heap(HeapError),
    /// `max_rank` is zero or above [`MAX_RANK`].
    InvalidMaxRank {
        /// The configured value.
        configured: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heap(e) => write!(f, "heap: {e}"),
            Self::InvalidMaxRank { configured } => {
                write!(f, "max_rank {configured} outside 1..={MAX_RANK}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Heap(e) => Some(e),
            Self::InvalidMaxRank { .. } => None,
        }
    }
}

impl From<HeapError> for ConfigError {
    fn from(e: HeapError) -> Self {
        Self::Heap(e)
    }
}

// ── RuntimeConfig ──────────────────────────────────────────────────

/// Complete configuration for constructing an
/// [`ArrayRuntime`](crate::ArrayRuntime).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Managed heap sizing.
    pub heap: HeapConfig,
    /// Largest array rank the type registry accepts. Default: 32.
    pub max_rank: u32,
}

impl RuntimeConfig {
    /// Default maximum rank.
    pub const DEFAULT_MAX_RANK: u32 = MAX_RANK as u32;

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rank == 0 || self.max_rank > MAX_RANK as u32 {
            return Err(ConfigError::InvalidMaxRank {
                configured: self.max_rank,
            });
        }
        self.heap.validate()?;
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            heap: HeapConfig::default(),
            max_rank: Self::DEFAULT_MAX_RANK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(RuntimeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn max_rank_bounds_enforced() {
        for bad in [0, MAX_RANK as u32 + 1] {
            let config = RuntimeConfig {
                max_rank: bad,
                ..RuntimeConfig::default()
            };
            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidMaxRank { configured: bad })
            );
        }
    }

    #[test]
    fn heap_errors_are_wrapped_with_source() {
        let config = RuntimeConfig {
            heap: HeapConfig {
                segment_words: 7,
                ..HeapConfig::default()
            },
            ..RuntimeConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Heap(HeapError::InvalidConfig { .. })));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("heap: "));
    }
}
