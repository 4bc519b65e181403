//! # Core Local Interruptor (CLINT)
//!
//! Memory map (SiFive layout, also used by QEMU virt):
//!
//! ```text
//! base + 0x0000 + 4*hart   MSIP      software-interrupt-pending (bit 0)
//! base + 0x4000 + 8*hart   MTIMECMP  timer compare
//! base + 0xBFF8            MTIME     free-running counter
//! ```
//!
//! Any hart may raise any hart's MSIP bit. By convention a hart only clears
//! its own bit, from its own software interrupt handler, so two harts never
//! race on clearing the same bit.
//!
//! On RV32 the 64-bit MTIME and MTIMECMP registers are accessed as two
//! words. MTIME is read high/low/high; MTIMECMP is written low = all ones,
//! then high, then low, so no intermediate value lies in the past.

use super::LocalCpu;
use crate::arch::riscv::sbi::{FirmwareGateway, SbiRet};
use crate::arch::riscv::smp::HartId;
use crate::arch::riscv::timers::widen_split;

/// MSIP register array offset
pub const MSIP_OFFSET: usize = 0x0000;
/// MTIMECMP register array offset
pub const MTIMECMP_OFFSET: usize = 0x4000;
/// MTIME register offset
pub const MTIME_OFFSET: usize = 0xBFF8;

// ============================================================================
// Software Interrupt Pending Bits
// ============================================================================

/// One software-interrupt-pending bit per hardware hart id
pub trait SoftIrqPending {
    /// Raise the software interrupt of `hart`
    fn raise(&self, hart: HartId);

    /// Clear the software interrupt of `hart`
    fn clear(&self, hart: HartId);

    /// Is the software interrupt of `hart` pending?
    fn is_raised(&self, hart: HartId) -> bool;
}

impl<T: SoftIrqPending + ?Sized> SoftIrqPending for &T {
    fn raise(&self, hart: HartId) {
        (**self).raise(hart)
    }

    fn clear(&self, hart: HartId) {
        (**self).clear(hart)
    }

    fn is_raised(&self, hart: HartId) -> bool {
        (**self).is_raised(hart)
    }
}

// ============================================================================
// CLINT
// ============================================================================

/// Memory-mapped CLINT register block
#[derive(Debug, Clone, Copy)]
pub struct Clint {
    base: usize,
}

impl Clint {
    /// Create a CLINT handle
    ///
    /// # Safety
    /// `base` must be the address of a CLINT register block that stays mapped
    /// for the lifetime of the handle.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    fn msip(&self, hart: HartId) -> *mut u32 {
        (self.base + MSIP_OFFSET + hart.as_usize() * 4) as *mut u32
    }

    #[inline]
    fn mtimecmp(&self, hart: HartId) -> *mut u64 {
        (self.base + MTIMECMP_OFFSET + hart.as_usize() * 8) as *mut u64
    }

    /// Write the MSIP register of `hart`
    #[inline]
    pub fn write_msip(&self, hart: HartId, value: u32) {
        // SAFETY: `new` guarantees the register block is mapped.
        unsafe { core::ptr::write_volatile(self.msip(hart), value) };
    }

    /// Read the MSIP register of `hart`
    #[inline]
    pub fn read_msip(&self, hart: HartId) -> u32 {
        // SAFETY: `new` guarantees the register block is mapped.
        unsafe { core::ptr::read_volatile(self.msip(hart)) }
    }

    /// Program MTIMECMP of `hart`
    #[inline]
    pub fn set_mtimecmp(&self, hart: HartId, value: u64) {
        if cfg!(target_pointer_width = "32") {
            self.set_mtimecmp_split(hart, value);
        } else {
            // SAFETY: `new` guarantees the register block is mapped.
            unsafe { core::ptr::write_volatile(self.mtimecmp(hart), value) };
        }
    }

    fn set_mtimecmp_split(&self, hart: HartId, value: u64) {
        let lo = self.mtimecmp(hart) as *mut u32;
        let hi = lo.wrapping_add(1);
        // SAFETY: `new` guarantees the register block is mapped.
        unsafe {
            core::ptr::write_volatile(lo, u32::MAX);
            core::ptr::write_volatile(hi, (value >> 32) as u32);
            core::ptr::write_volatile(lo, value as u32);
        }
    }

    /// Read MTIME
    #[inline]
    pub fn mtime(&self) -> u64 {
        if cfg!(target_pointer_width = "32") {
            self.mtime_split()
        } else {
            // SAFETY: `new` guarantees the register block is mapped.
            unsafe { core::ptr::read_volatile((self.base + MTIME_OFFSET) as *const u64) }
        }
    }

    fn mtime_split(&self) -> u64 {
        let lo = (self.base + MTIME_OFFSET) as *const u32;
        let hi = lo.wrapping_add(1);
        // SAFETY: `new` guarantees the register block is mapped.
        widen_split(|| unsafe { core::ptr::read_volatile(hi) }, || unsafe {
            core::ptr::read_volatile(lo)
        })
    }
}

impl SoftIrqPending for Clint {
    fn raise(&self, hart: HartId) {
        self.write_msip(hart, 1);
    }

    fn clear(&self, hart: HartId) {
        self.write_msip(hart, 0);
    }

    fn is_raised(&self, hart: HartId) -> bool {
        self.read_msip(hart) & 1 != 0
    }
}

// ============================================================================
// Machine-Mode Gateway
// ============================================================================

/// Firmware gateway of a machine-mode port
///
/// There is no monitor below machine mode. Deadlines go straight into the
/// calling hart's MTIMECMP, and every hart leaves reset by itself and parks
/// in the boot stub, so a start request has nothing left to do.
#[derive(Debug, Clone, Copy)]
pub struct ClintGateway<'a, C> {
    clint: &'a Clint,
    cpu: C,
}

impl<'a, C: LocalCpu> ClintGateway<'a, C> {
    /// Gateway over `clint`; `cpu` names the calling hart
    pub const fn new(clint: &'a Clint, cpu: C) -> Self {
        Self { clint, cpu }
    }
}

impl<C: LocalCpu> FirmwareGateway for ClintGateway<'_, C> {
    fn set_timer(&self, absolute_time: u64) -> SbiRet {
        self.clint.set_mtimecmp(self.cpu.hart_id(), absolute_time);
        SbiRet::success(0)
    }

    fn hart_start(&self, hart: HartId, entry: usize, _opaque: usize) -> SbiRet {
        log::debug!("clint: {} runs from reset, entry {:#x} unused", hart, entry);
        SbiRet::success(0)
    }
}
