//! # SBI Hart State Management (HSM) Extension
//!
//! Only `hart_start` is used by the port; the wake protocol itself does not
//! depend on whether a hart was released through HSM or a platform reset
//! line.

use super::{base, eid, hsm_fid, SbiRet};
use crate::arch::riscv::smp::HartId;

/// Start a hart
///
/// # Arguments
/// * `hart` - The hardware hart to start
/// * `start_addr` - Physical address where the hart begins executing
/// * `opaque` - Value passed to the hart in `a1`
pub fn hart_start(hart: HartId, start_addr: usize, opaque: usize) -> SbiRet {
    base::sbi_call_3(eid::HSM, hsm_fid::HART_START, hart.as_usize(), start_addr, opaque)
}
