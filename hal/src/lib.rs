//! # RISC-V Platform Port HAL
//!
//! Hardware abstraction for bringing a multicore RISC-V processor under an
//! RTOS kernel: secondary hart wake-up, scheduler IPIs and the system tick.
//!
//! Everything here runs before the kernel has a scheduler, a heap or any
//! blocking primitive. The only tools are memory-mapped registers, atomics
//! and busy-waiting.
//!
//! ## Crate Layout
//!
//! - [`arch::riscv`]: the port itself
//!   - [`arch::riscv::smp`]: wake coordinator, secondary entry, IPIs
//!   - [`arch::riscv::timers`]: cycle counter and tick driver
//!   - [`arch::riscv::interrupts`]: CLINT, interrupt lines, ISR table
//!   - [`arch::riscv::sbi`]: firmware call gateway
//!
//! The kernel, the interrupt framework and the SBI firmware are
//! collaborators reached through the traits in [`arch::riscv::kernel`],
//! [`arch::riscv::interrupts`] and [`arch::riscv::sbi`]. The RISC-V glue
//! that binds those traits to real hardware lives in `arch::riscv::port`
//! and is only built for RISC-V targets.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod arch;

pub use arch::riscv::{
    config::{ConfigError, PlatformConfig, TimerMode},
    smp::{CpuIndex, HartId, SmpError},
};
