//! # Platform Configuration
//!
//! Build/boot-time constants of the port. A [`PlatformConfig`] is built in a
//! `const` context and never mutated; every driver copies the fields it needs
//! at construction time.

use super::interrupts::PrivilegeMode;
use super::MAX_HARTS;

// ============================================================================
// Timer Mode
// ============================================================================

/// Tick timer operating mode, fixed at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// One interrupt per tick; elapsed-tick queries always report zero
    Periodic,
    /// The kernel may query ticks elapsed since the last announcement
    Tickless,
}

impl TimerMode {
    /// Is this the tickless mode?
    pub const fn is_tickless(self) -> bool {
        matches!(self, Self::Tickless)
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Invalid platform configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No SMP harts configured
    NoCpus,
    /// `base_hart + num_cpus` exceeds the per-hart table capacity
    TooManyHarts,
    /// Tick rate of zero
    ZeroTickRate,
    /// Counter runs slower than the tick rate
    ZeroCyclesPerTick,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoCpus => write!(f, "no cpus configured"),
            Self::TooManyHarts => write!(f, "hart ids exceed table capacity ({})", MAX_HARTS),
            Self::ZeroTickRate => write!(f, "ticks per second is zero"),
            Self::ZeroCyclesPerTick => write!(f, "fewer than one cycle per tick"),
        }
    }
}

// ============================================================================
// Platform Configuration
// ============================================================================

/// Platform configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Number of harts the kernel schedules on
    pub num_cpus: usize,
    /// Hart id of logical cpu 0 (1 when hart 0 is a monitor hart)
    pub base_hart: usize,
    /// Frequency of the `time` counter
    pub cycles_per_sec: u64,
    /// Kernel tick rate
    pub ticks_per_sec: u64,
    /// Tick timer mode
    pub timer_mode: TimerMode,
    /// Privilege level whose interrupt numbering the port uses
    pub irq_mode: PrivilegeMode,
    /// Address handed to SBI `hart_start`
    pub hart_start_addr: usize,
}

impl PlatformConfig {
    /// QEMU virt defaults: 4 harts, 10 MHz timebase, 100 Hz tick
    pub const QEMU_VIRT: Self = Self {
        num_cpus: 4,
        base_hart: 0,
        cycles_per_sec: 10_000_000,
        ticks_per_sec: 100,
        timer_mode: TimerMode::Periodic,
        irq_mode: PrivilegeMode::Machine,
        hart_start_addr: super::DRAM_BASE_QEMU,
    };

    /// Microchip PolarFire SoC: E51 monitor at hart 0, four U54 application harts
    pub const POLARFIRE: Self = Self {
        num_cpus: 4,
        base_hart: 1,
        cycles_per_sec: 1_000_000,
        ticks_per_sec: 1000,
        timer_mode: TimerMode::Periodic,
        irq_mode: PrivilegeMode::Machine,
        hart_start_addr: 0x0800_0000,
    };

    /// Replace the timer mode
    pub const fn with_timer_mode(mut self, mode: TimerMode) -> Self {
        self.timer_mode = mode;
        self
    }

    /// Replace the base hart offset
    pub const fn with_base_hart(mut self, base_hart: usize) -> Self {
        self.base_hart = base_hart;
        self
    }

    /// Hardware cycles per kernel tick
    pub const fn cycles_per_tick(&self) -> u64 {
        if self.ticks_per_sec == 0 {
            0
        } else {
            self.cycles_per_sec / self.ticks_per_sec
        }
    }

    /// Number of wake-flag slots the configuration uses
    pub const fn total_harts(&self) -> usize {
        self.base_hart + self.num_cpus
    }

    /// Check the configuration
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.num_cpus == 0 {
            return Err(ConfigError::NoCpus);
        }
        if self.total_harts() > MAX_HARTS {
            return Err(ConfigError::TooManyHarts);
        }
        if self.ticks_per_sec == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.cycles_per_tick() == 0 {
            return Err(ConfigError::ZeroCyclesPerTick);
        }
        Ok(())
    }

    /// `validate()` as a `const` boolean, for compile-time assertions
    pub const fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
