//! Many threads creating arrays over one runtime.

use std::sync::{Arc, Barrier};

use crossbeam_channel::unbounded;
use tessera_array::{ArrayRequest, ArrayRuntime, RuntimeConfig};
use tessera_core::{ArrayRef, TypeHandle};
use tessera_heap::HeapConfig;
use tessera_test_utils::{init_tracing, SampleTypes};

const THREADS: usize = 8;
const PER_THREAD: usize = 64;

fn shared_runtime() -> Arc<ArrayRuntime> {
    init_tracing();
    Arc::new(
        ArrayRuntime::new(RuntimeConfig {
            heap: HeapConfig {
                segment_words: 16 * 1024,
                max_heap_bytes: 64 << 20,
                card_shift: 8,
            },
            ..RuntimeConfig::default()
        })
        .unwrap(),
    )
}

#[test]
fn concurrent_first_resolution_converges_on_one_type() {
    let rt = shared_runtime();
    let types = SampleTypes::register(rt.registry());
    let element = types.widget.clone();
    let start = Arc::new(Barrier::new(THREADS));
    let (tx, rx) = unbounded::<(usize, ArrayRef)>();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let rt = Arc::clone(&rt);
            let element = element.clone();
            let start = Arc::clone(&start);
            let tx = tx.clone();
            std::thread::spawn(move || {
                start.wait();
                for i in 0..PER_THREAD {
                    let lengths = [(i % 5) as i32 + 1, 2];
                    let arr = rt
                        .create_instance(&ArrayRequest::from_element_type(&element, &lengths))
                        .unwrap();
                    tx.send((t, arr)).unwrap();
                }
            })
        })
        .collect();
    drop(tx);

    let results: Vec<(usize, ArrayRef)> = rx.iter().collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(results.len(), THREADS * PER_THREAD);
    let types_seen: Vec<TypeHandle> = results
        .iter()
        .map(|(_, arr)| rt.array_type_of(*arr).unwrap())
        .collect();
    assert!(types_seen
        .windows(2)
        .all(|w| TypeHandle::ptr_eq(&w[0], &w[1])));
    assert_eq!(rt.registry().array_type_count(), 1);
    assert_eq!(rt.modes().cooperative_threads(), 0);

    let mut addrs: Vec<usize> = results.iter().map(|(_, a)| a.addr()).collect();
    addrs.sort_unstable();
    addrs.dedup();
    assert_eq!(addrs.len(), THREADS * PER_THREAD);
}

#[test]
fn mixed_paths_under_contention() {
    let rt = shared_runtime();
    let types = Arc::new(SampleTypes::register(rt.registry()));
    let (tx, rx) = unbounded::<Result<usize, String>>();

    std::thread::scope(|s| {
        for t in 0..THREADS {
            let rt = &rt;
            let types = Arc::clone(&types);
            let tx = tx.clone();
            s.spawn(move || {
                for i in 0..PER_THREAD {
                    let request_len = (t + i) as i32 % 7;
                    let result = match i % 4 {
                        0 => rt.create_instance(&ArrayRequest::from_element_type(
                            &types.int32,
                            &[request_len],
                        )),
                        1 => rt.create_instance(&ArrayRequest::from_element_type(
                            &types.string,
                            &[request_len],
                        )),
                        2 => rt.create_instance(
                            &ArrayRequest::from_element_type(&types.point, &[request_len])
                                .with_lower_bounds(&[-3]),
                        ),
                        _ => rt.create_instance(&ArrayRequest::from_element_type(
                            &types.color,
                            &[request_len, 2, 1],
                        )),
                    };
                    let report = result
                        .map(|arr| rt.heap().view(arr).map_or(usize::MAX, |v| v.len()))
                        .map_err(|e| e.to_string());
                    tx.send(report).unwrap();
                }
            });
        }
    });
    drop(tx);

    let reports: Vec<_> = rx.iter().collect();
    assert_eq!(reports.len(), THREADS * PER_THREAD);
    assert!(reports.iter().all(|r| matches!(r, Ok(n) if *n != usize::MAX)));
    // int32 uses the primitive path, so only String[], Point[*], Color[,,].
    assert_eq!(rt.registry().array_type_count(), 3);
    assert_eq!(rt.modes().cooperative_threads(), 0);
}
