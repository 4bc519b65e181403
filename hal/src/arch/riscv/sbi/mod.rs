//! # Supervisor Binary Interface (SBI)
//!
//! The firmware call gateway: a trap into the monitor for services the
//! kernel cannot perform itself. The port needs two of them, programming the
//! next timer interrupt and starting a hart.
//!
//! ## Submodules
//!
//! - `base`: `ecall` wrappers and the [`base::Sbi`] gateway
//! - `timer`: Timer extension
//! - `hsm`: Hart State Management extension

pub mod base;
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub mod hsm;
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub mod timer;

pub use base::Sbi;

use super::smp::HartId;

// ============================================================================
// Extension and Function IDs
// ============================================================================

/// SBI extension IDs
pub mod eid {
    /// Base extension
    pub const BASE: usize = 0x10;
    /// Timer extension ("TIME")
    pub const TIME: usize = 0x5449_4D45;
    /// Hart State Management extension ("HSM")
    pub const HSM: usize = 0x0048_534D;
}

/// Timer extension function IDs
pub mod time_fid {
    /// sbi_set_timer
    pub const SET_TIMER: usize = 0;
}

/// HSM extension function IDs
pub mod hsm_fid {
    /// sbi_hart_start
    pub const HART_START: usize = 0;
}

// ============================================================================
// SBI Return Type
// ============================================================================

/// Raw SBI call return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbiRet {
    /// Error code (0 = success)
    pub error: isize,
    /// Return value
    pub value: isize,
}

impl SbiRet {
    /// Successful return with `value`
    pub const fn success(value: isize) -> Self {
        Self { error: 0, value }
    }

    /// Check if the call succeeded
    pub const fn is_success(&self) -> bool {
        self.error == 0
    }

    /// Get result as Result
    pub fn into_result(self) -> Result<isize, SbiError> {
        if self.is_success() {
            Ok(self.value)
        } else {
            Err(SbiError::from_raw(self.error))
        }
    }
}

// ============================================================================
// SBI Errors
// ============================================================================

/// Standard SBI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbiError {
    /// SBI_ERR_FAILED
    Failed,
    /// SBI_ERR_NOT_SUPPORTED
    NotSupported,
    /// SBI_ERR_INVALID_PARAM
    InvalidParam,
    /// SBI_ERR_DENIED
    Denied,
    /// SBI_ERR_INVALID_ADDRESS
    InvalidAddress,
    /// SBI_ERR_ALREADY_AVAILABLE
    AlreadyAvailable,
    /// SBI_ERR_ALREADY_STARTED
    AlreadyStarted,
    /// SBI_ERR_ALREADY_STOPPED
    AlreadyStopped,
    /// SBI_ERR_NO_SHMEM
    NoShmem,
    /// Any other non-zero code
    Unknown(isize),
}

impl SbiError {
    /// Convert from a raw SBI error code
    pub const fn from_raw(code: isize) -> Self {
        match code {
            -1 => Self::Failed,
            -2 => Self::NotSupported,
            -3 => Self::InvalidParam,
            -4 => Self::Denied,
            -5 => Self::InvalidAddress,
            -6 => Self::AlreadyAvailable,
            -7 => Self::AlreadyStarted,
            -8 => Self::AlreadyStopped,
            -9 => Self::NoShmem,
            other => Self::Unknown(other),
        }
    }

    /// Raw SBI error code
    pub const fn code(self) -> isize {
        match self {
            Self::Failed => -1,
            Self::NotSupported => -2,
            Self::InvalidParam => -3,
            Self::Denied => -4,
            Self::InvalidAddress => -5,
            Self::AlreadyAvailable => -6,
            Self::AlreadyStarted => -7,
            Self::AlreadyStopped => -8,
            Self::NoShmem => -9,
            Self::Unknown(code) => code,
        }
    }
}

impl core::fmt::Display for SbiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown SBI error {}", code),
            other => write!(f, "{:?} ({})", other, other.code()),
        }
    }
}

// ============================================================================
// Firmware Gateway
// ============================================================================

/// Firmware services consumed by the port
///
/// Both calls are a narrow request/response: the gateway performs the trap
/// and hands back the monitor's `{error, value}` pair untouched.
pub trait FirmwareGateway {
    /// Request the next timer interrupt of the calling hart at or after
    /// `absolute_time`
    fn set_timer(&self, absolute_time: u64) -> SbiRet;

    /// Request the monitor start `hart` at `entry`, with `opaque` in `a1`
    fn hart_start(&self, hart: HartId, entry: usize, opaque: usize) -> SbiRet;
}

impl<T: FirmwareGateway + ?Sized> FirmwareGateway for &T {
    fn set_timer(&self, absolute_time: u64) -> SbiRet {
        (**self).set_timer(absolute_time)
    }

    fn hart_start(&self, hart: HartId, entry: usize, opaque: usize) -> SbiRet {
        (**self).hart_start(hart, entry, opaque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip_for_standard_codes() {
        for code in -9..=-1 {
            assert_eq!(SbiError::from_raw(code).code(), code);
        }
        assert_eq!(SbiError::from_raw(-42), SbiError::Unknown(-42));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(SbiRet::success(7).into_result(), Ok(7));
        let ret = SbiRet { error: -7, value: 0 };
        assert_eq!(ret.into_result(), Err(SbiError::AlreadyStarted));
    }
}
