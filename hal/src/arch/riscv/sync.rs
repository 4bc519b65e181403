//! # Interrupt-Safe Spin Lock
//!
//! A `spin::Mutex` taken with the calling hart's interrupts masked. The
//! holder cannot be preempted by an ISR on its own hart, so taking the lock
//! from interrupt context never deadlocks against itself; other harts
//! contend by spinning. Non-reentrant.

use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use spin::{Mutex, MutexGuard};

use super::interrupts::{IrqKey, LocalCpu};

/// Spin lock that masks local interrupts while held
#[derive(Debug)]
pub struct IrqSpinLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqSpinLock<T> {
    /// Create a new lock
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Mask interrupts on `cpu` and acquire the lock
    pub fn lock<'a, C: LocalCpu + ?Sized>(&'a self, cpu: &'a C) -> IrqSpinGuard<'a, T, C> {
        let key = cpu.irq_lock();
        IrqSpinGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            cpu,
            key,
        }
    }
}

/// Guard returned by [`IrqSpinLock::lock`]
///
/// Dropping it releases the lock first, then restores the interrupt state.
pub struct IrqSpinGuard<'a, T, C: LocalCpu + ?Sized> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
    cpu: &'a C,
    key: IrqKey,
}

impl<T: fmt::Debug, C: LocalCpu + ?Sized> fmt::Debug for IrqSpinGuard<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrqSpinGuard")
            .field("value", &**self)
            .field("key", &self.key)
            .finish()
    }
}

impl<T, C: LocalCpu + ?Sized> Deref for IrqSpinGuard<'_, T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T, C: LocalCpu + ?Sized> DerefMut for IrqSpinGuard<'_, T, C> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T, C: LocalCpu + ?Sized> Drop for IrqSpinGuard<'_, T, C> {
    fn drop(&mut self) {
        // SAFETY: `guard` is never touched again after this point.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.cpu.irq_restore(self.key);
    }
}
