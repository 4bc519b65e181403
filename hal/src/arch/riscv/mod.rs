//! # RISC-V Multicore Port
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RISC-V Multicore Port                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐       │
//! │  │       SMP        │  │      Timers      │  │    Interrupts    │       │
//! │  │                  │  │                  │  │                  │       │
//! │  │• Wake flags      │  │• rdtime counter  │  │• CLINT MSIP      │       │
//! │  │• Stack handoff   │  │• Tick driver     │  │• Lines (sie/mie) │       │
//! │  │• Start/secondary │  │• Tickless query  │  │• ISR table       │       │
//! │  │• Sched IPI       │  │                  │  │                  │       │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────┘       │
//! │           │                     │                      │                 │
//! │  ┌────────┴─────────────────────┴──────────────────────┴─────────┐     │
//! │  │          SBI gateway   │   Kernel hooks   │   Busy-wait poll   │     │
//! │  └────────────────────────────────────────────────────────────────┘     │
//! │                                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bring-up order on the boot hart:
//!
//! 1. [`smp::SchedIpi::init`] connects and unmasks the software interrupt.
//! 2. [`timers::TickTimer::initialize`] arms the first tick.
//! 3. The kernel calls [`smp::HartWakeCoordinator::start_core`] once per
//!    secondary, strictly in sequence (on hardware through
//!    `port::start_secondary_hart`, which powers the hart on first).
//!
//! Each secondary then runs [`smp::SecondarySequencer::secondary_entry`]
//! and, from the kernel's per-core bring-up, [`timers::TickTimer::smp_timer_init`].

pub mod config;
pub mod core;
pub mod interrupts;
pub mod kernel;
pub mod poll;
pub mod sbi;
pub mod smp;
pub mod sync;
pub mod timers;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub mod port;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Capacity of every per-hart table, indexed by hardware hart id
pub const MAX_HARTS: usize = 32;

/// Default CLINT base address (QEMU virt, SiFive)
pub const CLINT_BASE_QEMU: usize = 0x0200_0000;

/// Default DRAM base, used as the SBI hart start address (QEMU virt)
pub const DRAM_BASE_QEMU: usize = 0x8000_0000;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use config::{ConfigError, PlatformConfig, TimerMode};
pub use interrupts::{clint::Clint, ClintGateway, IrqLine, IrqLines, PrivilegeMode};
pub use kernel::{CpuHandle, CpuStartFn, KernelHooks};
pub use sbi::{FirmwareGateway, SbiError, SbiRet};
pub use smp::{
    CpuIndex, HartId, HartMap, HartWakeCoordinator, SchedIpi, SecondarySequencer, SmpError,
    StartToken, WakeFlag,
};
pub use timers::{CycleCounter, TickTimer};
