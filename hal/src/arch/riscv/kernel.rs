//! # Kernel Interface
//!
//! Callbacks the port exposes to the kernel, and the per-core setup
//! services it consumes during secondary bring-up.

use super::smp::CpuIndex;

/// Per-core bring-up entry, called once on each secondary hart with the
/// argument the kernel passed to `start_core`. It never returns.
pub type CpuStartFn = fn(arg: usize) -> !;

/// Opaque, pointer-sized reference to the kernel's per-CPU structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuHandle(usize);

impl CpuHandle {
    /// Wrap a pointer to the kernel's CPU record
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// Wrap a raw value
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Raw value
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

/// Kernel services the port calls into
///
/// `announce_ticks` and `sched_ipi` run in interrupt context.
pub trait KernelHooks {
    /// Time base: `ticks` kernel ticks have elapsed
    fn announce_ticks(&self, ticks: u32);

    /// A scheduler IPI was received on the calling hart
    fn sched_ipi(&self);

    /// The kernel's state record for `cpu`
    fn cpu_record(&self, cpu: CpuIndex) -> CpuHandle;
}

impl<T: KernelHooks + ?Sized> KernelHooks for &T {
    fn announce_ticks(&self, ticks: u32) {
        (**self).announce_ticks(ticks)
    }

    fn sched_ipi(&self) {
        (**self).sched_ipi()
    }

    fn cpu_record(&self, cpu: CpuIndex) -> CpuHandle {
        (**self).cpu_record(cpu)
    }
}

/// Per-core setup that must run before a secondary hart services any
/// interrupt. Each step only runs when its cargo feature is enabled.
pub trait CoreSetup {
    /// Configure the PMP interrupt stack guard (`pmp-stack-guard`)
    fn configure_stack_guard(&self) {}

    /// Instruction/data cache setup (`cache-setup`)
    fn setup_caches(&self) {}
}

impl<T: CoreSetup + ?Sized> CoreSetup for &T {
    fn configure_stack_guard(&self) {
        (**self).configure_stack_guard()
    }

    fn setup_caches(&self) {
        (**self).setup_caches()
    }
}
