//! Per-thread cooperative-mode tracking.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tessera_core::CooperativeMode;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// `(instance, depth)` for every tracker this thread is inside.
    static DEPTHS: RefCell<Vec<(u64, u32)>> = const { RefCell::new(Vec::new()) };
}

/// Tracks which threads are in cooperative mode for one runtime.
///
/// Entry nests per thread: only the outermost `enter` makes the thread
/// count as cooperative and only the matching outermost `leave` releases
/// it. A collector would wait for [`cooperative_threads`] to reach zero
/// before stopping the world.
///
/// [`cooperative_threads`]: ThreadModes::cooperative_threads
#[derive(Debug)]
pub struct ThreadModes {
    instance: u64,
    cooperative: AtomicUsize,
    transitions: AtomicU64,
}

impl ThreadModes {
    /// Create a tracker with no cooperative threads.
    pub fn new() -> Self {
        Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            cooperative: AtomicUsize::new(0),
            transitions: AtomicU64::new(0),
        }
    }

    /// Number of threads currently in cooperative mode.
    pub fn cooperative_threads(&self) -> usize {
        self.cooperative.load(Ordering::Acquire)
    }

    /// Whether the calling thread is in cooperative mode.
    pub fn is_cooperative(&self) -> bool {
        self.depth() > 0
    }

    /// Nesting depth of the calling thread.
    pub fn depth(&self) -> u32 {
        DEPTHS.with(|d| {
            d.borrow()
                .iter()
                .find(|(id, _)| *id == self.instance)
                .map_or(0, |&(_, depth)| depth)
        })
    }

    /// Outermost preemptible-to-cooperative transitions since creation.
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }
}

impl Default for ThreadModes {
    fn default() -> Self {
        Self::new()
    }
}

impl CooperativeMode for ThreadModes {
    fn enter(&self) {
        DEPTHS.with(|d| {
            let mut depths = d.borrow_mut();
            match depths.iter_mut().find(|(id, _)| *id == self.instance) {
                Some((_, depth)) => *depth += 1,
                None => {
                    depths.push((self.instance, 1));
                    self.cooperative.fetch_add(1, Ordering::AcqRel);
                    self.transitions.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }

    fn leave(&self) {
        DEPTHS.with(|d| {
            let mut depths = d.borrow_mut();
            let Some(pos) = depths.iter().position(|(id, _)| *id == self.instance) else {
                debug_assert!(false, "leave without matching enter");
                return;
            };
            depths[pos].1 -= 1;
            if depths[pos].1 == 0 {
                depths.swap_remove(pos);
                self.cooperative.fetch_sub(1, Ordering::AcqRel);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use tessera_core::CoopGuard;

    #[test]
    fn starts_preemptible() {
        let modes = ThreadModes::new();
        assert!(!modes.is_cooperative());
        assert_eq!(modes.cooperative_threads(), 0);
    }

    #[test]
    fn guard_enters_and_leaves() {
        let modes = ThreadModes::new();
        {
            let _coop = CoopGuard::enter(&modes);
            assert!(modes.is_cooperative());
            assert_eq!(modes.cooperative_threads(), 1);
        }
        assert!(!modes.is_cooperative());
        assert_eq!(modes.cooperative_threads(), 0);
    }

    #[test]
    fn nesting_counts_thread_once() {
        let modes = ThreadModes::new();
        let outer = CoopGuard::enter(&modes);
        let inner = CoopGuard::enter(&modes);
        assert_eq!(modes.depth(), 2);
        assert_eq!(modes.cooperative_threads(), 1);
        drop(inner);
        assert!(modes.is_cooperative());
        drop(outer);
        assert_eq!(modes.cooperative_threads(), 0);
        assert_eq!(modes.transitions(), 1);
    }

    #[test]
    fn trackers_are_independent() {
        let a = ThreadModes::new();
        let b = ThreadModes::new();
        let _ga = CoopGuard::enter(&a);
        assert!(a.is_cooperative());
        assert!(!b.is_cooperative());
        assert_eq!(b.cooperative_threads(), 0);
    }

    #[test]
    fn counts_threads_across_threads() {
        let modes = Arc::new(ThreadModes::new());
        let inside = Arc::new(Barrier::new(5));
        let release = Arc::new(Barrier::new(5));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let modes = Arc::clone(&modes);
                let inside = Arc::clone(&inside);
                let release = Arc::clone(&release);
                std::thread::spawn(move || {
                    let _coop = CoopGuard::enter(&*modes);
                    inside.wait();
                    release.wait();
                })
            })
            .collect();
        inside.wait();
        assert_eq!(modes.cooperative_threads(), 4);
        assert!(!modes.is_cooperative());
        release.wait();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(modes.cooperative_threads(), 0);
    }

    #[test]
    fn panic_inside_guard_releases_thread() {
        let modes = ThreadModes::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _coop = CoopGuard::enter(&modes);
            panic!("allocation failed");
        }));
        assert!(result.is_err());
        assert_eq!(modes.cooperative_threads(), 0);
        assert!(!modes.is_cooperative());
    }
}
