//! # SBI Calls
//!
//! `ecall` wrappers and the [`Sbi`] gateway. The calls themselves only exist
//! on RISC-V targets.

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
use super::{FirmwareGateway, SbiRet};
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
use crate::arch::riscv::smp::HartId;

// ============================================================================
// SBI Call Wrappers
// ============================================================================

/// Make an SBI call with 2 arguments
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
#[inline]
pub fn sbi_call_2(eid: usize, fid: usize, arg0: usize, arg1: usize) -> SbiRet {
    let error: isize;
    let value: isize;

    unsafe {
        core::arch::asm!(
            "ecall",
            in("a7") eid,
            in("a6") fid,
            inlateout("a0") arg0 => error,
            inlateout("a1") arg1 => value,
            options(nostack)
        );
    }

    SbiRet { error, value }
}

/// Make an SBI call with 3 arguments
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
#[inline]
pub fn sbi_call_3(eid: usize, fid: usize, arg0: usize, arg1: usize, arg2: usize) -> SbiRet {
    let error: isize;
    let value: isize;

    unsafe {
        core::arch::asm!(
            "ecall",
            in("a7") eid,
            in("a6") fid,
            inlateout("a0") arg0 => error,
            inlateout("a1") arg1 => value,
            in("a2") arg2,
            options(nostack)
        );
    }

    SbiRet { error, value }
}

// ============================================================================
// Gateway
// ============================================================================

/// Firmware gateway backed by `ecall`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sbi;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
impl FirmwareGateway for Sbi {
    fn set_timer(&self, absolute_time: u64) -> SbiRet {
        super::timer::set_timer(absolute_time)
    }

    fn hart_start(&self, hart: HartId, entry: usize, opaque: usize) -> SbiRet {
        super::hsm::hart_start(hart, entry, opaque)
    }
}

/// Split a 64-bit SBI argument into the (low, high) register pair used on RV32
#[inline]
pub const fn split_u64(value: u64) -> (usize, usize) {
    (value as u32 as usize, (value >> 32) as u32 as usize)
}
