//! Simulated platform for host tests
//!
//! Each test thread plays one hart; [`set_current_hart`] picks which.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::interrupts::{IrqKey, IrqLines, LocalCpu, SoftIrqPending};
use super::kernel::{CoreSetup, CpuHandle, KernelHooks};
use super::sbi::{FirmwareGateway, SbiRet};
use super::smp::{CpuIndex, HartId};
use super::timers::CycleCounter;
use super::MAX_HARTS;

thread_local! {
    static CURRENT_HART: Cell<usize> = const { Cell::new(0) };
}

/// Make the calling thread act as `hart`
pub fn set_current_hart(hart: HartId) {
    CURRENT_HART.with(|h| h.set(hart.as_usize()));
}

fn current_hart() -> usize {
    CURRENT_HART.with(Cell::get)
}

fn per_hart<T>(f: impl Fn() -> T) -> [T; MAX_HARTS] {
    core::array::from_fn(|_| f())
}

// ============================================================================
// Local CPU
// ============================================================================

/// Per-hart enable masks and global interrupt flags
#[derive(Debug)]
pub struct SimCpu {
    lines: [AtomicUsize; MAX_HARTS],
    global: [AtomicBool; MAX_HARTS],
}

impl SimCpu {
    pub fn new() -> Self {
        Self {
            lines: per_hart(|| AtomicUsize::new(0)),
            global: per_hart(|| AtomicBool::new(false)),
        }
    }

    /// Lines unmasked on `hart`
    pub fn lines_of(&self, hart: HartId) -> IrqLines {
        IrqLines::from_bits_truncate(self.lines[hart.as_usize()].load(Ordering::SeqCst))
    }

    /// Global interrupt enable of the calling hart
    pub fn irqs_enabled(&self) -> bool {
        self.global[current_hart()].load(Ordering::SeqCst)
    }
}

impl LocalCpu for SimCpu {
    fn hart_id(&self) -> HartId {
        HartId::new(current_hart())
    }

    fn enable_lines(&self, lines: IrqLines) {
        self.lines[current_hart()].fetch_or(lines.bits(), Ordering::SeqCst);
    }

    fn irq_unlock_global(&self) {
        self.global[current_hart()].store(true, Ordering::SeqCst);
    }

    fn irq_lock(&self) -> IrqKey {
        IrqKey(self.global[current_hart()].swap(false, Ordering::SeqCst) as usize)
    }

    fn irq_restore(&self, key: IrqKey) {
        self.global[current_hart()].store(key.0 != 0, Ordering::SeqCst);
    }
}

// ============================================================================
// Software Interrupt Pending Bits
// ============================================================================

/// In-memory pending bits that also count raises
#[derive(Debug)]
pub struct SimPending {
    bits: [AtomicBool; MAX_HARTS],
    raises: [AtomicUsize; MAX_HARTS],
}

impl SimPending {
    pub fn new() -> Self {
        Self {
            bits: per_hart(|| AtomicBool::new(false)),
            raises: per_hart(|| AtomicUsize::new(0)),
        }
    }

    /// Number of times `hart`'s bit was raised
    pub fn raise_count(&self, hart: HartId) -> usize {
        self.raises[hart.as_usize()].load(Ordering::SeqCst)
    }
}

impl SoftIrqPending for SimPending {
    fn raise(&self, hart: HartId) {
        self.raises[hart.as_usize()].fetch_add(1, Ordering::SeqCst);
        self.bits[hart.as_usize()].store(true, Ordering::SeqCst);
    }

    fn clear(&self, hart: HartId) {
        self.bits[hart.as_usize()].store(false, Ordering::SeqCst);
    }

    fn is_raised(&self, hart: HartId) -> bool {
        self.bits[hart.as_usize()].load(Ordering::SeqCst)
    }
}

// ============================================================================
// Counter
// ============================================================================

/// Counter the test sets by hand
#[derive(Debug, Default)]
pub struct SimCounter(AtomicU64);

impl SimCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: u64) {
        self.0.store(value, Ordering::SeqCst);
    }
}

impl CycleCounter for SimCounter {
    fn read(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Firmware
// ============================================================================

/// Firmware that records every call
#[derive(Debug, Default)]
pub struct SimFirmware {
    deadlines: Mutex<Vec<u64>>,
    started: Mutex<Vec<(HartId, usize, usize)>>,
    error: AtomicIsize,
}

impl SimFirmware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call return `code`
    pub fn fail_with(&self, code: isize) {
        self.error.store(code, Ordering::SeqCst);
    }

    pub fn deadlines(&self) -> Vec<u64> {
        self.deadlines.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<(HartId, usize, usize)> {
        self.started.lock().unwrap().clone()
    }

    fn ret(&self) -> SbiRet {
        SbiRet {
            error: self.error.load(Ordering::SeqCst),
            value: 0,
        }
    }
}

impl FirmwareGateway for SimFirmware {
    fn set_timer(&self, absolute_time: u64) -> SbiRet {
        self.deadlines.lock().unwrap().push(absolute_time);
        self.ret()
    }

    fn hart_start(&self, hart: HartId, entry: usize, opaque: usize) -> SbiRet {
        self.started.lock().unwrap().push((hart, entry, opaque));
        self.ret()
    }
}

// ============================================================================
// Kernel
// ============================================================================

/// Kernel hooks that count what they receive
#[derive(Debug)]
pub struct SimKernel {
    ticks: AtomicU32,
    ipis: [AtomicUsize; MAX_HARTS],
}

impl SimKernel {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
            ipis: per_hart(|| AtomicUsize::new(0)),
        }
    }

    /// Total ticks announced
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Scheduler IPIs delivered on `hart`
    pub fn ipis_on(&self, hart: HartId) -> usize {
        self.ipis[hart.as_usize()].load(Ordering::SeqCst)
    }
}

impl KernelHooks for SimKernel {
    fn announce_ticks(&self, ticks: u32) {
        self.ticks.fetch_add(ticks, Ordering::SeqCst);
    }

    fn sched_ipi(&self) {
        self.ipis[current_hart()].fetch_add(1, Ordering::SeqCst);
    }

    fn cpu_record(&self, cpu: CpuIndex) -> CpuHandle {
        CpuHandle::from_raw(0x1000 + cpu.as_usize() * 0x100)
    }
}

// ============================================================================
// Core Setup
// ============================================================================

/// Counts setup calls
#[derive(Debug, Default)]
pub struct SimSetup {
    guard: AtomicUsize,
    cache: AtomicUsize,
}

impl SimSetup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard_calls(&self) -> usize {
        self.guard.load(Ordering::SeqCst)
    }

    pub fn cache_calls(&self) -> usize {
        self.cache.load(Ordering::SeqCst)
    }
}

impl CoreSetup for SimSetup {
    fn configure_stack_guard(&self) {
        self.guard.fetch_add(1, Ordering::SeqCst);
    }

    fn setup_caches(&self) {
        self.cache.fetch_add(1, Ordering::SeqCst);
    }
}
