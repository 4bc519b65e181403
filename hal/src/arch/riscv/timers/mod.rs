//! # Timer Framework
//!
//! ## Submodules
//!
//! - `mtime`: free-running counter sources (`time` CSR, CLINT `mtime`)
//! - `tick`: system tick driver, periodic and tickless

pub mod mtime;
pub mod tick;

pub use mtime::{widen_split, TimeCsr};
pub use tick::{TickTimer, TimerState};

/// A free-running hardware cycle counter
///
/// Monotonic for the life of the system; 64 bits wide, widened from a
/// 32-bit register pair where the hardware is narrower.
pub trait CycleCounter {
    /// Current counter value
    fn read(&self) -> u64;
}

impl<T: CycleCounter + ?Sized> CycleCounter for &T {
    fn read(&self) -> u64 {
        (**self).read()
    }
}
