//! # RISC-V Interrupt Framework
//!
//! The port only uses two local interrupt lines: the software interrupt
//! (scheduler IPIs and the hart wake signal) and the timer interrupt (the
//! system tick).
//!
//! ## Submodules
//!
//! - `clint`: Core Local Interruptor (software-interrupt-pending bits)
//! - `irq`: ISR table and cause dispatch
//!
//! The generic interrupt framework of the kernel is a collaborator: the
//! port reaches it through [`IsrRegistry`] and [`LocalCpu`].

pub mod clint;
pub mod irq;

pub use clint::{Clint, ClintGateway, SoftIrqPending};
pub use irq::{IrqError, IsrTable};

use super::core::csr::{interrupt, irq_cause};
use super::smp::HartId;

// ============================================================================
// Privilege Mode
// ============================================================================

/// Privilege level whose interrupt numbering and CSRs the port uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeMode {
    /// `mie`/`mstatus.MIE`, causes 3 (software) and 7 (timer)
    Machine,
    /// `sie`/`sstatus.SIE`, causes 1 (software) and 5 (timer)
    Supervisor,
}

// ============================================================================
// Interrupt Lines
// ============================================================================

bitflags::bitflags! {
    /// Local interrupt enable bits, as laid out in `sie`/`mie`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IrqLines: usize {
        /// Supervisor software interrupt
        const S_SOFT = interrupt::SSIP;
        /// Machine software interrupt
        const M_SOFT = interrupt::MSIP;
        /// Supervisor timer interrupt
        const S_TIMER = interrupt::STIP;
        /// Machine timer interrupt
        const M_TIMER = interrupt::MTIP;
        /// Supervisor external interrupt
        const S_EXT = interrupt::SEIP;
        /// Machine external interrupt
        const M_EXT = interrupt::MEIP;
    }
}

/// A local interrupt line used by the port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqLine {
    /// Software interrupt (IPI)
    Software,
    /// Timer interrupt
    Timer,
}

impl IrqLine {
    /// Interrupt cause code for this line
    pub const fn cause(self, mode: PrivilegeMode) -> usize {
        match (self, mode) {
            (Self::Software, PrivilegeMode::Machine) => irq_cause::MACHINE_SOFTWARE,
            (Self::Software, PrivilegeMode::Supervisor) => irq_cause::SUPERVISOR_SOFTWARE,
            (Self::Timer, PrivilegeMode::Machine) => irq_cause::MACHINE_TIMER,
            (Self::Timer, PrivilegeMode::Supervisor) => irq_cause::SUPERVISOR_TIMER,
        }
    }

    /// Enable bit for this line
    pub const fn enable_bit(self, mode: PrivilegeMode) -> IrqLines {
        match (self, mode) {
            (Self::Software, PrivilegeMode::Machine) => IrqLines::M_SOFT,
            (Self::Software, PrivilegeMode::Supervisor) => IrqLines::S_SOFT,
            (Self::Timer, PrivilegeMode::Machine) => IrqLines::M_TIMER,
            (Self::Timer, PrivilegeMode::Supervisor) => IrqLines::S_TIMER,
        }
    }
}

// ============================================================================
// Collaborator Interfaces
// ============================================================================

/// Interrupt service routine, shared by all harts through one vector entry
pub type Isr = fn();

/// Saved interrupt-enable state returned by [`LocalCpu::irq_lock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqKey(pub usize);

/// Operations on the calling hart
pub trait LocalCpu {
    /// Hardware id of the calling hart
    fn hart_id(&self) -> HartId;

    /// Unmask `lines` on the calling hart
    fn enable_lines(&self, lines: IrqLines);

    /// Set the global interrupt enable of the calling hart
    fn irq_unlock_global(&self);

    /// Clear the global interrupt enable, returning the previous state
    fn irq_lock(&self) -> IrqKey;

    /// Restore a state returned by [`LocalCpu::irq_lock`]
    fn irq_restore(&self, key: IrqKey);
}

/// Registration side of the kernel's interrupt framework
pub trait IsrRegistry {
    /// Route `line` to `isr`
    fn connect(&self, line: IrqLine, isr: Isr) -> Result<(), IrqError>;
}

impl<T: LocalCpu + ?Sized> LocalCpu for &T {
    fn hart_id(&self) -> HartId {
        (**self).hart_id()
    }

    fn enable_lines(&self, lines: IrqLines) {
        (**self).enable_lines(lines)
    }

    fn irq_unlock_global(&self) {
        (**self).irq_unlock_global()
    }

    fn irq_lock(&self) -> IrqKey {
        (**self).irq_lock()
    }

    fn irq_restore(&self, key: IrqKey) {
        (**self).irq_restore(key)
    }
}

impl<T: IsrRegistry + ?Sized> IsrRegistry for &T {
    fn connect(&self, line: IrqLine, isr: Isr) -> Result<(), IrqError> {
        (**self).connect(line, isr)
    }
}
