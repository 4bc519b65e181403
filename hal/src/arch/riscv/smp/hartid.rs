//! # Hart Ids and CPU Indices
//!
//! Two numbering spaces live side by side: the kernel counts logical cpus
//! from zero, the hardware (CLINT, wake flags, `mhartid`) counts harts. On
//! boards with a monitor hart at id 0 the two differ by a base offset. The
//! types below do not convert into each other; only [`HartMap`] crosses
//! between them.

use super::SmpError;
use crate::arch::riscv::config::PlatformConfig;
use crate::arch::riscv::MAX_HARTS;

// ============================================================================
// Hart ID
// ============================================================================

/// Hardware hart id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HartId(usize);

impl HartId {
    /// Create a new HartId
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw hart ID value
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for HartId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "hart{}", self.0)
    }
}

// ============================================================================
// CPU Index
// ============================================================================

/// Logical cpu index, as used by the kernel
///
/// Only produced by [`HartMap::cpu`], so a value is always below the
/// configured cpu count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuIndex(usize);

impl CpuIndex {
    /// Get the raw index
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for CpuIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

// ============================================================================
// Hart Map
// ============================================================================

/// Mapping between logical cpus and hardware harts
///
/// `hart = cpu + base`, with harts contiguous from `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HartMap {
    base: usize,
    num_cpus: usize,
}

impl HartMap {
    /// Create a map for `num_cpus` harts starting at hart id `base`
    pub const fn new(base: usize, num_cpus: usize) -> Result<Self, SmpError> {
        if num_cpus == 0 {
            return Err(SmpError::InvalidCpu);
        }
        if base + num_cpus > MAX_HARTS {
            return Err(SmpError::TooManyHarts);
        }
        Ok(Self { base, num_cpus })
    }

    /// Map described by a platform configuration
    pub const fn from_config(config: &PlatformConfig) -> Result<Self, SmpError> {
        Self::new(config.base_hart, config.num_cpus)
    }

    /// Hart id of logical cpu 0
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Number of logical cpus
    pub const fn num_cpus(&self) -> usize {
        self.num_cpus
    }

    /// Validate a raw logical cpu index
    pub const fn cpu(&self, index: usize) -> Result<CpuIndex, SmpError> {
        if index < self.num_cpus {
            Ok(CpuIndex(index))
        } else {
            Err(SmpError::InvalidCpu)
        }
    }

    /// Hardware hart of a logical cpu
    pub const fn hart_of(&self, cpu: CpuIndex) -> HartId {
        HartId(cpu.0 + self.base)
    }

    /// Logical cpu running on `hart`, if it is one of ours
    pub const fn cpu_of(&self, hart: HartId) -> Option<CpuIndex> {
        if hart.0 >= self.base && hart.0 < self.base + self.num_cpus {
            Some(CpuIndex(hart.0 - self.base))
        } else {
            None
        }
    }

    /// All configured hart ids, in ascending order
    pub fn harts(&self) -> impl Iterator<Item = HartId> {
        (self.base..self.base + self.num_cpus).map(HartId)
    }
}
