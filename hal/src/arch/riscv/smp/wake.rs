//! # Hart Wake Flags
//!
//! One flag per hardware hart id, indexed by mhartid directly. The table
//! lives in memory that is not zeroed at load, so a slot holds garbage until
//! its hart writes it; states are distinct magic words and anything else
//! decodes to `None`.
//!
//! Only the owning hart writes `WAIT` and `DONE`; only the boot hart writes
//! `GO`. A slot moves `WAIT -> GO -> DONE` and never skips a state.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::HartId;
use crate::arch::riscv::poll::{Spin, SpinHook};
use crate::arch::riscv::MAX_HARTS;

/// Wake handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum WakeFlag {
    /// Secondary is parked and asks to be released
    Wait = 0x5741_4954,
    /// Boot hart grants release
    Go = 0x0000_474F,
    /// Secondary has consumed its start parameters
    Done = 0x444F_4E45,
}

impl WakeFlag {
    /// Decode a raw slot value
    pub const fn decode(raw: usize) -> Option<Self> {
        match raw {
            0x5741_4954 => Some(Self::Wait),
            0x0000_474F => Some(Self::Go),
            0x444F_4E45 => Some(Self::Done),
            _ => None,
        }
    }

    /// Raw slot value
    pub const fn raw(self) -> usize {
        self as usize
    }
}

/// Wake flag slots, one per hardware hart id
///
/// Laid out as a plain `[usize; MAX_HARTS]` so the boot stub can address
/// slot `mhartid` directly.
#[derive(Debug)]
#[repr(transparent)]
pub struct WakeFlagTable {
    slots: [AtomicUsize; MAX_HARTS],
}

impl WakeFlagTable {
    /// Create a table with every slot cleared
    pub const fn new() -> Self {
        const CLEAR: AtomicUsize = AtomicUsize::new(0);
        Self {
            slots: [CLEAR; MAX_HARTS],
        }
    }

    /// Current state of `hart`'s slot
    pub fn load(&self, hart: HartId) -> Option<WakeFlag> {
        self.slots
            .get(hart.as_usize())
            .and_then(|slot| WakeFlag::decode(slot.load(Ordering::Acquire)))
    }

    /// Write `hart`'s slot; ids outside the table are ignored
    pub fn store(&self, hart: HartId, flag: WakeFlag) {
        if let Some(slot) = self.slots.get(hart.as_usize()) {
            slot.store(flag.raw(), Ordering::Release);
        }
    }

    /// Does `hart`'s slot hold `flag`?
    pub fn is(&self, hart: HartId, flag: WakeFlag) -> bool {
        self.load(hart) == Some(flag)
    }

    // ------------------------------------------------------------------------
    // Secondary side
    // ------------------------------------------------------------------------

    /// Secondary: ask the boot hart to be released
    pub fn announce_wait(&self, hart: HartId) {
        self.store(hart, WakeFlag::Wait);
    }

    /// Secondary: spin until the boot hart writes `GO`
    ///
    /// On hardware the hart sits in `wfi` between polls and the software
    /// interrupt wakes it.
    pub fn wait_for_go<H: SpinHook + ?Sized>(&self, hart: HartId, hook: &H) -> usize {
        Spin::new(hook).until(|| self.is(hart, WakeFlag::Go))
    }

    /// Secondary: confirm the start parameters have been consumed
    pub fn confirm_done(&self, hart: HartId) {
        self.store(hart, WakeFlag::Done);
    }
}
