//! # RISC-V Control and Status Registers (CSRs)
//!
//! The subset of CSRs the port touches: interrupt enable (`sie`/`mie`),
//! global interrupt enable (`sstatus.SIE`/`mstatus.MIE`), the hart id and the
//! `time` counter.
//!
//! Bit and cause constants are available on every target. The accessors are
//! only compiled for RISC-V.

// ============================================================================
// Status Register Bits (sstatus/mstatus)
// ============================================================================

/// Status register bits
pub mod status {
    /// Supervisor Interrupt Enable
    pub const SIE: usize = 1 << 1;
    /// Machine Interrupt Enable
    pub const MIE: usize = 1 << 3;
}

// ============================================================================
// Interrupt Enable/Pending Bits (sie/sip/mie/mip)
// ============================================================================

/// Interrupt bits
pub mod interrupt {
    /// Supervisor Software Interrupt
    pub const SSIP: usize = 1 << 1;
    /// Machine Software Interrupt
    pub const MSIP: usize = 1 << 3;
    /// Supervisor Timer Interrupt
    pub const STIP: usize = 1 << 5;
    /// Machine Timer Interrupt
    pub const MTIP: usize = 1 << 7;
    /// Supervisor External Interrupt
    pub const SEIP: usize = 1 << 9;
    /// Machine External Interrupt
    pub const MEIP: usize = 1 << 11;
}

/// Interrupt cause codes (top bit of xcause set)
pub mod irq_cause {
    /// Supervisor software interrupt
    pub const SUPERVISOR_SOFTWARE: usize = 1;
    /// Machine software interrupt
    pub const MACHINE_SOFTWARE: usize = 3;
    /// Supervisor timer interrupt
    pub const SUPERVISOR_TIMER: usize = 5;
    /// Machine timer interrupt
    pub const MACHINE_TIMER: usize = 7;
    /// Supervisor external interrupt
    pub const SUPERVISOR_EXTERNAL: usize = 9;
    /// Machine external interrupt
    pub const MACHINE_EXTERNAL: usize = 11;
}

/// Interrupt bit in cause register
pub const CAUSE_INTERRUPT_BIT: usize = 1 << (usize::BITS - 1);

/// Split a raw `xcause` value into (is_interrupt, code)
#[inline]
pub const fn decode_cause(cause: usize) -> (bool, usize) {
    (cause & CAUSE_INTERRUPT_BIT != 0, cause & !CAUSE_INTERRUPT_BIT)
}

// ============================================================================
// Accessors
// ============================================================================

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use self::access::*;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
mod access {
    use core::arch::asm;

    /// Set bits in sie
    #[inline]
    pub fn set_sie(bits: usize) {
        unsafe { asm!("csrs sie, {}", in(reg) bits, options(nomem, nostack)) };
    }

    /// Set bits in mie
    #[inline]
    pub fn set_mie(bits: usize) {
        unsafe { asm!("csrs mie, {}", in(reg) bits, options(nomem, nostack)) };
    }

    /// Set bits in sstatus, returning the previous value
    #[inline]
    pub fn read_set_sstatus(bits: usize) -> usize {
        let old: usize;
        unsafe { asm!("csrrs {}, sstatus, {}", out(reg) old, in(reg) bits, options(nomem, nostack)) };
        old
    }

    /// Clear bits in sstatus, returning the previous value
    #[inline]
    pub fn read_clear_sstatus(bits: usize) -> usize {
        let old: usize;
        unsafe { asm!("csrrc {}, sstatus, {}", out(reg) old, in(reg) bits, options(nomem, nostack)) };
        old
    }

    /// Set bits in mstatus, returning the previous value
    #[inline]
    pub fn read_set_mstatus(bits: usize) -> usize {
        let old: usize;
        unsafe { asm!("csrrs {}, mstatus, {}", out(reg) old, in(reg) bits, options(nomem, nostack)) };
        old
    }

    /// Clear bits in mstatus, returning the previous value
    #[inline]
    pub fn read_clear_mstatus(bits: usize) -> usize {
        let old: usize;
        unsafe { asm!("csrrc {}, mstatus, {}", out(reg) old, in(reg) bits, options(nomem, nostack)) };
        old
    }

    /// Read mhartid (M-mode only)
    #[inline]
    pub fn read_mhartid() -> usize {
        let id: usize;
        unsafe { asm!("csrr {}, mhartid", out(reg) id, options(nomem, nostack, preserves_flags)) };
        id
    }

    /// Read the hart id cached in `tp` by the boot stub (S-mode)
    #[inline]
    pub fn read_tp() -> usize {
        let tp: usize;
        unsafe { asm!("mv {}, tp", out(reg) tp, options(nomem, nostack, preserves_flags)) };
        tp
    }

    /// Read the low word of the time counter
    #[inline(always)]
    pub fn read_time() -> usize {
        let time: usize;
        unsafe { asm!("rdtime {}", out(reg) time, options(nomem, nostack, preserves_flags)) };
        time
    }

    /// Read the high word of the time counter (RV32 only)
    #[cfg(target_arch = "riscv32")]
    #[inline(always)]
    pub fn read_timeh() -> usize {
        let time: usize;
        unsafe { asm!("rdtimeh {}", out(reg) time, options(nomem, nostack, preserves_flags)) };
        time
    }
}
