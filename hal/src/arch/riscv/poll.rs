//! # Busy-Wait Polling
//!
//! Before a scheduler exists, waiting means spinning. Every wait in the port
//! goes through [`Spin`], which runs a [`SpinHook`] on each unsuccessful
//! poll: some debug probes that halt or single-step a core cannot tell an
//! empty spin loop from a hang, so each iteration must do observable work.
//!
//! ```text
//! loop {
//!     ready()?          ── yes ──▶ return misses
//!     misses += 1 (wrapping)
//!     hook.on_spin(misses)
//!     misses % every == 0 ──▶ retry()
//! }
//! ```

use core::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Hooks
// ============================================================================

/// Observable work performed on every iteration of a busy-wait
pub trait SpinHook {
    /// Called after each unsuccessful poll; `iteration` counts from 1
    fn on_spin(&self, iteration: usize);
}

impl<T: SpinHook + ?Sized> SpinHook for &T {
    fn on_spin(&self, iteration: usize) {
        (**self).on_spin(iteration)
    }
}

/// Hook that increments a shared counter
#[derive(Debug, Default)]
pub struct SpinCounter(AtomicUsize);

impl SpinCounter {
    /// Create a counter at zero
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Total iterations counted so far
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl SpinHook for SpinCounter {
    fn on_spin(&self, _iteration: usize) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// Spin
// ============================================================================

/// A busy-wait on a condition
#[derive(Debug)]
pub struct Spin<'h, H: ?Sized> {
    hook: &'h H,
}

impl<'h, H: SpinHook + ?Sized> Spin<'h, H> {
    /// Spin with `hook` as the per-iteration side effect
    pub const fn new(hook: &'h H) -> Self {
        Self { hook }
    }

    /// Spin until `ready` returns true; returns the number of misses
    ///
    /// There is no bound: a condition that never holds hangs the caller.
    /// The miss count wraps, so a hart held in a debugger long enough keeps
    /// spinning instead of overflowing.
    pub fn until(&self, ready: impl FnMut() -> bool) -> usize {
        self.run(0, usize::MAX, ready, || {})
    }

    /// Like [`Spin::until`], also calling `retry` on every `every`th miss
    pub fn until_with_retry(
        &self,
        every: usize,
        ready: impl FnMut() -> bool,
        retry: impl FnMut(),
    ) -> usize {
        self.run(0, every.max(1), ready, retry)
    }

    fn run(
        &self,
        mut misses: usize,
        every: usize,
        mut ready: impl FnMut() -> bool,
        mut retry: impl FnMut(),
    ) -> usize {
        while !ready() {
            misses = misses.wrapping_add(1);
            self.hook.on_spin(misses);
            if misses % every == 0 {
                retry();
            }
            core::hint::spin_loop();
        }
        misses
    }
}
