//! # SMP Bring-Up and Scheduler IPIs
//!
//! ## Submodules
//!
//! - `hartid`: hardware hart ids, logical cpu indices and the map between them
//! - `wake`: the per-hart WAIT/GO/DONE wake flags
//! - `handoff`: stack handoff slot, start token and pending-start table
//! - `startup`: primary-side wake coordinator
//! - `secondary`: secondary-side entry sequencer
//! - `ipi`: scheduler IPI broadcast and handler
//!
//! ## Wake protocol
//!
//! ```text
//!  boot hart (start_core)                 secondary hart (stub + entry)
//!  ──────────────────────                 ─────────────────────────────
//!  record {fn, arg}, bind cpu record
//!  publish stack top
//!  spin until flag == WAIT        ◀────── flag = WAIT, then wfi
//!  flag = GO, raise MSIP          ──────▶ wakes, sees GO
//!                                         loads stack top
//!  spin until flag == DONE        ◀────── flag = DONE
//!   (re-raise MSIP every 64 spins)        secondary_entry(cpu)
//!  clear MSIP, return token                 └─▶ fn(arg), never returns
//! ```

pub mod handoff;
pub mod hartid;
pub mod ipi;
pub mod secondary;
pub mod startup;
pub mod wake;

pub use handoff::{BootTables, PendingStart, StackHandoff, StartTable, StartToken};
pub use hartid::{CpuIndex, HartId, HartMap};
pub use ipi::SchedIpi;
pub use secondary::SecondarySequencer;
pub use startup::HartWakeCoordinator;
pub use wake::{WakeFlag, WakeFlagTable};

// ============================================================================
// Errors
// ============================================================================

/// SMP errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmpError {
    /// Logical cpu index outside the configured range
    InvalidCpu,
    /// Base offset plus cpu count exceeds the hart tables
    TooManyHarts,
    /// The start token was already handed out
    TokenTaken,
    /// No pending start recorded for the cpu
    NotPrepared,
    /// The start token belongs to another start table
    ForeignToken,
}

impl core::fmt::Display for SmpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidCpu => write!(f, "invalid cpu index"),
            Self::TooManyHarts => write!(f, "hart id range exceeds table capacity"),
            Self::TokenTaken => write!(f, "start token already taken"),
            Self::NotPrepared => write!(f, "no pending start for cpu"),
            Self::ForeignToken => write!(f, "start token issued by another table"),
        }
    }
}
