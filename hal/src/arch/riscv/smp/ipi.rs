//! # Scheduler IPIs
//!
//! A scheduler IPI is the software interrupt: the sender raises the target's
//! software-interrupt-pending bit, the target clears its own bit and calls
//! into the scheduler. One handler serves every hart through a single vector
//! entry; the only per-hart step is reading the hart id.

use core::sync::atomic::{AtomicBool, Ordering};

use super::HartMap;
use crate::arch::riscv::interrupts::{
    IrqError, IrqLine, Isr, IsrRegistry, LocalCpu, PrivilegeMode, SoftIrqPending,
};
use crate::arch::riscv::kernel::KernelHooks;

/// Scheduler IPI broadcast and handler
#[derive(Debug)]
pub struct SchedIpi<P, C, R, K> {
    map: HartMap,
    mode: PrivilegeMode,
    pending: P,
    cpu: C,
    registry: R,
    kernel: K,
    initialized: AtomicBool,
}

impl<P, C, R, K> SchedIpi<P, C, R, K>
where
    P: SoftIrqPending,
    C: LocalCpu,
    R: IsrRegistry,
    K: KernelHooks,
{
    /// Create the IPI subsystem
    pub const fn new(
        map: HartMap,
        mode: PrivilegeMode,
        pending: P,
        cpu: C,
        registry: R,
        kernel: K,
    ) -> Self {
        Self {
            map,
            mode,
            pending,
            cpu,
            registry,
            kernel,
            initialized: AtomicBool::new(false),
        }
    }

    /// Connect `isr` to the software interrupt and unmask it on the calling
    /// hart
    ///
    /// `isr` must end up in [`SchedIpi::on_software_interrupt`]. Calling
    /// this again is a no-op. Secondary harts unmask the line themselves
    /// during their entry sequence.
    pub fn init(&self, isr: Isr) -> Result<(), IrqError> {
        if self.initialized.load(Ordering::Acquire) {
            log::warn!("ipi: already initialized");
            return Ok(());
        }

        match self.registry.connect(IrqLine::Software, isr) {
            Ok(()) | Err(IrqError::AlreadyConnected) => {},
            Err(e) => return Err(e),
        }
        self.cpu.enable_lines(IrqLine::Software.enable_bit(self.mode));
        self.initialized.store(true, Ordering::Release);

        log::info!(
            "ipi: software interrupt ready on {} ({} harts from hart{})",
            self.cpu.hart_id(),
            self.map.num_cpus(),
            self.map.base()
        );
        Ok(())
    }

    /// Has [`SchedIpi::init`] completed?
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Raise the software interrupt of every configured hart, the caller
    /// included
    pub fn notify_all_cores(&self) {
        for hart in self.map.harts() {
            self.pending.raise(hart);
        }
    }

    /// Software interrupt handler
    ///
    /// Clears the calling hart's own pending bit, then notifies the
    /// scheduler.
    pub fn on_software_interrupt(&self) {
        let hart = self.cpu.hart_id();
        self.pending.clear(hart);
        log::trace!("ipi: {}", hart);
        self.kernel.sched_ipi();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::riscv::interrupts::{IrqLines, IsrTable};
    use crate::arch::riscv::smp::HartId;
    use crate::arch::riscv::testing::{set_current_hart, SimCpu, SimKernel, SimPending};

    fn noop_isr() {}

    fn other_isr() {}

    #[test]
    fn test_init_is_idempotent() {
        let pending = SimPending::new();
        let cpu = SimCpu::new();
        let table = IsrTable::new(PrivilegeMode::Machine);
        let kernel = SimKernel::new();
        let ipi = SchedIpi::new(
            HartMap::new(0, 2).unwrap(),
            PrivilegeMode::Machine,
            &pending,
            &cpu,
            &table,
            &kernel,
        );

        assert!(!ipi.is_initialized());
        assert_eq!(ipi.init(noop_isr), Ok(()));
        assert_eq!(ipi.init(other_isr), Ok(()));
        assert!(ipi.is_initialized());
        assert!(table.is_connected(IrqLine::Software));
        assert_eq!(cpu.lines_of(HartId::new(0)), IrqLines::M_SOFT);
    }

    #[test]
    fn test_broadcast_and_handle_exactly_once() {
        let pending = SimPending::new();
        let cpu = SimCpu::new();
        let table = IsrTable::new(PrivilegeMode::Machine);
        let kernel = SimKernel::new();
        let map = HartMap::new(1, 4).unwrap();
        let ipi = SchedIpi::new(map, PrivilegeMode::Machine, &pending, &cpu, &table, &kernel);

        ipi.notify_all_cores();
        assert!(!pending.is_raised(HartId::new(0)));
        for hart in map.harts() {
            assert!(pending.is_raised(hart));
        }

        // Each hart takes its interrupt on its own thread.
        std::thread::scope(|s| {
            for hart in map.harts() {
                let (ipi, pending) = (&ipi, &pending);
                s.spawn(move || {
                    set_current_hart(hart);
                    if pending.is_raised(hart) {
                        ipi.on_software_interrupt();
                    }
                    // A second pass sees nothing pending.
                    if pending.is_raised(hart) {
                        ipi.on_software_interrupt();
                    }
                });
            }
        });

        for hart in map.harts() {
            assert!(!pending.is_raised(hart));
            assert_eq!(kernel.ipis_on(hart), 1);
        }
        assert_eq!(kernel.ipis_on(HartId::new(0)), 0);
    }
}
