//! # Secondary Hart Entry
//!
//! First Rust code a secondary hart runs. The boot stub has already done the
//! WAIT/GO/DONE handshake and switched to the handed-off stack; what is left
//! is per-core setup that must precede any interrupt, unmasking the
//! software interrupt, and jumping into the kernel's per-core bring-up.

use super::handoff::{PendingStart, StartTable};
use super::{HartMap, SmpError};
use crate::arch::riscv::interrupts::{IrqLine, LocalCpu, PrivilegeMode};
use crate::arch::riscv::kernel::CoreSetup;

/// Secondary-hart side of the bring-up
#[derive(Debug)]
pub struct SecondarySequencer<'a, C, S> {
    map: HartMap,
    mode: PrivilegeMode,
    starts: &'a StartTable,
    cpu: C,
    setup: S,
}

impl<'a, C: LocalCpu, S: CoreSetup> SecondarySequencer<'a, C, S> {
    /// Create a sequencer
    pub const fn new(
        map: HartMap,
        mode: PrivilegeMode,
        starts: &'a StartTable,
        cpu: C,
        setup: S,
    ) -> Self {
        Self {
            map,
            mode,
            starts,
            cpu,
            setup,
        }
    }

    /// Run the per-core setup for logical cpu `index` and return its start
    /// request
    pub fn prepare(&self, index: usize) -> Result<PendingStart, SmpError> {
        let cpu = self.map.cpu(index)?;
        let start = self.starts.take(cpu).ok_or(SmpError::NotPrepared)?;

        if cfg!(feature = "pmp-stack-guard") {
            self.setup.configure_stack_guard();
        }
        if cfg!(feature = "cache-setup") {
            self.setup.setup_caches();
        }

        self.cpu.enable_lines(IrqLine::Software.enable_bit(self.mode));
        log::debug!("smp: {} entering kernel on {}", cpu, self.cpu.hart_id());

        Ok(start)
    }

    /// Entry point of secondary logical cpu `index`
    ///
    /// Hands control to the start function recorded by `start_core`. A cpu
    /// without one is parked for good.
    pub fn secondary_entry(&self, index: usize) -> ! {
        match self.prepare(index) {
            Ok(start) => (start.entry)(start.arg),
            Err(e) => {
                log::error!("smp: cpu{} cannot start: {}", index, e);
                loop {
                    core::hint::spin_loop();
                }
            },
        }
    }
}
