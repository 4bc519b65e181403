//! # Start Handoff
//!
//! State the boot hart leaves behind for a secondary: the start function
//! and argument per cpu, the kernel's cpu record per cpu, and the initial
//! stack pointer of the hart being started.
//!
//! There is a single stack slot, valid for one start in flight. Sequential
//! use is enforced through [`StartToken`]: `start_core` consumes the token
//! and hands it back only once the previous hart has confirmed `DONE`.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use spin::Mutex;

use super::{CpuIndex, SmpError, WakeFlagTable};
use crate::arch::riscv::kernel::{CpuHandle, CpuStartFn};
use crate::arch::riscv::MAX_HARTS;

// ============================================================================
// Stack Handoff
// ============================================================================

/// Initial stack pointer for the hart currently being started
///
/// Read by the boot stub between observing `GO` and writing `DONE`.
#[derive(Debug)]
#[repr(transparent)]
pub struct StackHandoff(AtomicUsize);

impl StackHandoff {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Publish the stack top for the next hart
    pub fn publish(&self, stack_top: usize) {
        self.0.store(stack_top, Ordering::Release);
    }

    /// Current stack top
    pub fn load(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================================
// Start Token
// ============================================================================

/// Permission to have one secondary start in flight
///
/// Not `Clone`: there is exactly one per table, obtained from
/// [`StartTable::take_token`], and it only opens starts on that table.
#[derive(Debug)]
#[must_use = "dropping the start token prevents any further secondary start"]
pub struct StartToken<'a> {
    table: &'a StartTable,
}

impl StartToken<'_> {
    /// Was this token handed out by `table`?
    pub fn issued_by(&self, table: &StartTable) -> bool {
        core::ptr::eq(self.table, table)
    }
}

// ============================================================================
// Pending Starts
// ============================================================================

/// Start request recorded for a secondary cpu
#[derive(Clone, Copy)]
pub struct PendingStart {
    /// Per-core bring-up entry
    pub entry: CpuStartFn,
    /// Argument passed to `entry`
    pub arg: usize,
}

impl core::fmt::Debug for PendingStart {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PendingStart")
            .field("entry", &(self.entry as usize as *const ()))
            .field("arg", &self.arg)
            .finish()
    }
}

/// Per-cpu start requests and cpu-record bindings, indexed by logical cpu
#[derive(Debug)]
pub struct StartTable {
    pending: [Mutex<Option<PendingStart>>; MAX_HARTS],
    records: [AtomicUsize; MAX_HARTS],
    token_taken: AtomicBool,
}

impl StartTable {
    /// Create an empty table
    pub const fn new() -> Self {
        const EMPTY: Mutex<Option<PendingStart>> = Mutex::new(None);
        const UNBOUND: AtomicUsize = AtomicUsize::new(0);
        Self {
            pending: [EMPTY; MAX_HARTS],
            records: [UNBOUND; MAX_HARTS],
            token_taken: AtomicBool::new(false),
        }
    }

    /// Hand out the start token; succeeds once
    pub fn take_token(&self) -> Result<StartToken<'_>, SmpError> {
        if self.token_taken.swap(true, Ordering::AcqRel) {
            Err(SmpError::TokenTaken)
        } else {
            Ok(StartToken { table: self })
        }
    }

    /// Record the start request of `cpu`
    pub fn record(&self, cpu: CpuIndex, start: PendingStart) {
        *self.pending[cpu.as_usize()].lock() = Some(start);
    }

    /// Take the start request of `cpu`
    pub fn take(&self, cpu: CpuIndex) -> Option<PendingStart> {
        self.pending[cpu.as_usize()].lock().take()
    }

    /// Bind the kernel's cpu record to `cpu`
    pub fn bind(&self, cpu: CpuIndex, record: CpuHandle) {
        self.records[cpu.as_usize()].store(record.as_raw(), Ordering::Release);
    }

    /// Cpu record bound to `cpu`
    pub fn record_of(&self, cpu: CpuIndex) -> CpuHandle {
        CpuHandle::from_raw(self.records[cpu.as_usize()].load(Ordering::Acquire))
    }
}

// ============================================================================
// Boot Tables
// ============================================================================

/// The shared boot-time state, borrowed by both sides of the wake protocol
#[derive(Debug, Clone, Copy)]
pub struct BootTables<'a> {
    /// Wake flags, indexed by hart id
    pub flags: &'a WakeFlagTable,
    /// Stack slot for the start in flight
    pub handoff: &'a StackHandoff,
    /// Start requests, indexed by cpu
    pub starts: &'a StartTable,
}
