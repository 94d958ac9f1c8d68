//! Benchmark profiles and utilities for the Tessera array runtime.
//!
//! The managed heap never reclaims memory, so allocation benchmarks run in
//! chunks against fresh runtimes via [`time_in_chunks`].

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::{Duration, Instant};

use tessera_array::{ArrayRuntime, RuntimeConfig};
use tessera_heap::HeapConfig;

/// Iterations timed against one runtime before it is replaced.
pub const CHUNK: u64 = 4096;

/// Runtime profile: 1M-word segments, 256MB heap limit.
pub fn bench_config() -> RuntimeConfig {
    RuntimeConfig {
        heap: HeapConfig {
            segment_words: 1 << 20,
            max_heap_bytes: 256 << 20,
            ..HeapConfig::default()
        },
        ..RuntimeConfig::default()
    }
}

/// Fresh runtime built from [`bench_config`].
pub fn bench_runtime() -> ArrayRuntime {
    ArrayRuntime::new(bench_config()).expect("bench config is valid")
}

/// Time `iters` calls of `op`, switching to a fresh runtime every
/// [`CHUNK`] calls. `setup` runs untimed once per runtime and its output
/// is passed to every call. Suitable for `Bencher::iter_custom`.
pub fn time_in_chunks<S>(
    iters: u64,
    mut setup: impl FnMut(&ArrayRuntime) -> S,
    mut op: impl FnMut(&ArrayRuntime, &S),
) -> Duration {
    let mut elapsed = Duration::ZERO;
    let mut remaining = iters;
    while remaining > 0 {
        let n = remaining.min(CHUNK);
        let rt = bench_runtime();
        let state = setup(&rt);
        let start = Instant::now();
        for _ in 0..n {
            op(&rt, &state);
        }
        elapsed += start.elapsed();
        remaining -= n;
    }
    elapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_config_validates() {
        bench_config().validate().unwrap();
    }

    #[test]
    fn chunks_cover_all_iterations() {
        let mut setups = 0;
        let mut calls = 0;
        time_in_chunks(CHUNK * 2 + 1, |_| setups += 1, |_, _| calls += 1);
        assert_eq!(calls, CHUNK * 2 + 1);
        assert_eq!(setups, 3);
    }
}
