//! Scoped entry into collector-cooperative mode.

use std::fmt;
use std::marker::PhantomData;

use crate::traits::CooperativeMode;

/// RAII proof that the current thread is in cooperative mode.
///
/// Created by [`CoopGuard::enter`], which calls
/// [`CooperativeMode::enter`]; dropping the guard calls
/// [`CooperativeMode::leave`]. Because release lives in `Drop`, every exit
/// path (early `?` returns, panics) leaves cooperative mode.
///
/// Operations that touch managed memory take `&CoopGuard` so the borrow
/// checker witnesses the mode. The guard is `!Send`: thread mode is a
/// per-thread property.
#[must_use]
pub struct CoopGuard<'a> {
    mode: &'a dyn CooperativeMode,
    _not_send: PhantomData<*const ()>,
}

impl<'a> CoopGuard<'a> {
    /// Enter cooperative mode through `mode`.
    pub fn enter(mode: &'a dyn CooperativeMode) -> Self {
        mode.enter();
        Self {
            mode,
            _not_send: PhantomData,
        }
    }
}

impl Drop for CoopGuard<'_> {
    fn drop(&mut self) {
        self.mode.leave();
    }
}

impl fmt::Debug for CoopGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CoopGuard")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Default)]
    struct Depth(AtomicI32);

    impl CooperativeMode for Depth {
        fn enter(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_releases_on_drop() {
        let depth = Depth::default();
        {
            let _guard = CoopGuard::enter(&depth);
            assert_eq!(depth.0.load(Ordering::SeqCst), 1);
        }
        assert_eq!(depth.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn fallible(depth: &Depth) -> Result<(), ()> {
            let _guard = CoopGuard::enter(depth);
            Err::<(), ()>(())?;
            Ok(())
        }
        let depth = Depth::default();
        assert!(fallible(&depth).is_err());
        assert_eq!(depth.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn guard_releases_on_panic() {
        let depth = Depth::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = CoopGuard::enter(&depth);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(depth.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nested_guards_balance() {
        let depth = Depth::default();
        let outer = CoopGuard::enter(&depth);
        {
            let _inner = CoopGuard::enter(&depth);
            assert_eq!(depth.0.load(Ordering::SeqCst), 2);
        }
        drop(outer);
        assert_eq!(depth.0.load(Ordering::SeqCst), 0);
    }
}
