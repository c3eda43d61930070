//! Lifecycle pinning for the manager.
//!
//! Every registered participant holds a [`PinGuard`]. While any guard is
//! alive the manager reports itself pinned, so the owner knows the code
//! backing it is still in use. Once [`Lifecycle::retire`] is called no new
//! guard can be acquired, which makes further registrations fail with
//! `Unavailable` while existing participants can still unregister.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct LifecycleInner {
    retired: AtomicBool,
    pins: AtomicUsize,
}

/// Pin counter with a one-way retire switch.
///
/// Cloning yields another handle to the same counter.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

impl Lifecycle {
    /// Create a live, unpinned lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a guard, or `None` once retired.
    pub fn try_pin(&self) -> Option<PinGuard> {
        // Count first so a concurrent retire() never misses this pin.
        self.inner.pins.fetch_add(1, Ordering::SeqCst);
        if self.inner.retired.load(Ordering::SeqCst) {
            self.inner.pins.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(PinGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Refuse all future pins. Idempotent.
    ///
    /// Returns the number of guards still alive.
    pub fn retire(&self) -> usize {
        self.inner.retired.store(true, Ordering::SeqCst);
        self.pin_count()
    }

    /// Whether [`retire`](Self::retire) has been called.
    pub fn is_retired(&self) -> bool {
        self.inner.retired.load(Ordering::SeqCst)
    }

    /// Number of guards currently alive.
    pub fn pin_count(&self) -> usize {
        self.inner.pins.load(Ordering::SeqCst)
    }
}

/// Proof that the manager is pinned. Released on drop, exactly once.
#[must_use = "dropping a PinGuard releases the pin immediately"]
pub struct PinGuard {
    inner: Arc<LifecycleInner>,
}

impl fmt::Debug for PinGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinGuard")
            .field("pins", &self.inner.pins.load(Ordering::Relaxed))
            .finish()
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        self.inner.pins.fetch_sub(1, Ordering::SeqCst);
    }
}

static_assertions::assert_impl_all!(Lifecycle: Send, Sync);
static_assertions::assert_impl_all!(PinGuard: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_and_release() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.pin_count(), 0);

        let a = lifecycle.try_pin().expect("live lifecycle pins");
        let b = lifecycle.try_pin().expect("live lifecycle pins");
        assert_eq!(lifecycle.pin_count(), 2);

        drop(a);
        assert_eq!(lifecycle.pin_count(), 1);
        drop(b);
        assert_eq!(lifecycle.pin_count(), 0);
    }

    #[test]
    fn retired_refuses_new_pins() {
        let lifecycle = Lifecycle::new();
        let held = lifecycle.try_pin().unwrap();

        assert_eq!(lifecycle.retire(), 1);
        assert!(lifecycle.is_retired());
        assert!(lifecycle.try_pin().is_none());
        assert_eq!(lifecycle.pin_count(), 1);

        // Existing guards still release normally.
        drop(held);
        assert_eq!(lifecycle.pin_count(), 0);
    }

    #[test]
    fn clones_share_state() {
        let lifecycle = Lifecycle::new();
        let other = lifecycle.clone();
        let _guard = other.try_pin().unwrap();
        assert_eq!(lifecycle.pin_count(), 1);

        other.retire();
        assert!(lifecycle.is_retired());
    }
}
