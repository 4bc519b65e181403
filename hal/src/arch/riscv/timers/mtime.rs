//! # Counter Sources
//!
//! The `time` CSR is readable from S-mode (`rdtime`). On RV32 it is split
//! into `time` and `timeh`; the high half is read on both sides of the low
//! half and the read retried if a carry slipped in between.

use super::CycleCounter;
use crate::arch::riscv::interrupts::clint::Clint;

/// The `time` CSR
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCsr;

#[cfg(target_arch = "riscv64")]
impl CycleCounter for TimeCsr {
    #[inline]
    fn read(&self) -> u64 {
        crate::arch::riscv::core::csr::read_time() as u64
    }
}

#[cfg(target_arch = "riscv32")]
impl CycleCounter for TimeCsr {
    #[inline]
    fn read(&self) -> u64 {
        use crate::arch::riscv::core::csr::{read_time, read_timeh};
        widen_split(|| read_timeh() as u32, || read_time() as u32)
    }
}

/// Combine a counter split into two 32-bit halves into one 64-bit value
///
/// Reads high, low, high again, and retries until both high reads agree.
pub fn widen_split(mut read_hi: impl FnMut() -> u32, mut read_lo: impl FnMut() -> u32) -> u64 {
    loop {
        let hi = read_hi();
        let lo = read_lo();
        if read_hi() == hi {
            return ((hi as u64) << 32) | lo as u64;
        }
    }
}

/// The CLINT `mtime` register, for machine-mode boards
impl CycleCounter for Clint {
    fn read(&self) -> u64 {
        self.mtime()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::riscv::interrupts::clint::MTIME_OFFSET;

    #[test]
    fn test_widen_without_carry() {
        assert_eq!(widen_split(|| 1, || 0x10), 0x1_0000_0010);
    }

    #[test]
    fn test_widen_retries_across_carry() {
        // Low half wraps between the two high reads of the first attempt.
        let mut his = [0u32, 1, 1, 1].into_iter();
        let mut los = [0xFFFF_FFFFu32, 0x0000_0002].into_iter();
        let value = widen_split(|| his.next().unwrap(), || los.next().unwrap());
        assert_eq!(value, 0x1_0000_0002);
    }

    #[test]
    fn test_clint_mtime_counter() {
        let mut regs = vec![0u64; (MTIME_OFFSET + 8) / 8];
        regs[MTIME_OFFSET / 8] = 123_456;
        let clint = unsafe { Clint::new(regs.as_mut_ptr() as usize) };
        assert_eq!(CycleCounter::read(&clint), 123_456);
    }
}
