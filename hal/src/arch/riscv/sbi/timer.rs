//! # SBI Timer Extension
//!
//! Timer management via SBI.

use super::{base, eid, time_fid, SbiRet};

/// Set the timer deadline
///
/// Programs the timer to generate an interrupt when the time reaches
/// `stime_value`. RV64 passes the value in `a0`; RV32 splits it into
/// `a0` (low) and `a1` (high).
#[cfg(target_arch = "riscv64")]
pub fn set_timer(stime_value: u64) -> SbiRet {
    base::sbi_call_2(eid::TIME, time_fid::SET_TIMER, stime_value as usize, 0)
}

/// Set the timer deadline
///
/// Programs the timer to generate an interrupt when the time reaches
/// `stime_value`. RV64 passes the value in `a0`; RV32 splits it into
/// `a0` (low) and `a1` (high).
#[cfg(target_arch = "riscv32")]
pub fn set_timer(stime_value: u64) -> SbiRet {
    let (lo, hi) = base::split_u64(stime_value);
    base::sbi_call_2(eid::TIME, time_fid::SET_TIMER, lo, hi)
}

