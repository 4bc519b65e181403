//! # Board Glue
//!
//! The concrete port: statics wired to real hardware, the vector
//! trampolines, and the symbols shared with the boot stub and the kernel.
//!
//! ## Symbols
//!
//! | Symbol                  | Direction       | Meaning                          |
//! |-------------------------|-----------------|----------------------------------|
//! | `hart_wake_flags`       | stub <-> port   | WAIT/GO/DONE slots, by mhartid    |
//! | `riscv_cpu_sp`          | port -> stub    | stack top of the hart starting   |
//! | `rvport_secondary_start`| stub -> port    | secondary entry, `a0` = cpu index |
//! | `rvport_trap_irq`       | vector -> port  | interrupt dispatch, `a0` = cause  |
//! | `kernel_announce_ticks` | port -> kernel  | time base                        |
//! | `kernel_sched_ipi`      | port -> kernel  | scheduler IPI received           |
//! | `kernel_cpu_record`     | port -> kernel  | per-cpu state record             |

use static_assertions::const_assert;

use super::config::{PlatformConfig, TimerMode};
use super::core::csr::{self, status};
use super::interrupts::{
    Clint, ClintGateway, IrqError, IrqKey, IrqLines, IsrTable, LocalCpu, PrivilegeMode,
};
use super::kernel::{CoreSetup, CpuHandle, CpuStartFn, KernelHooks};
use super::sbi::{FirmwareGateway, Sbi, SbiError, SbiRet};
use super::smp::{
    BootTables, CpuIndex, HartId, HartMap, HartWakeCoordinator, SchedIpi, SecondarySequencer,
    SmpError, StackHandoff, StartTable, StartToken, WakeFlagTable,
};
use super::timers::{CycleCounter, TickTimer, TimeCsr};
use super::CLINT_BASE_QEMU;

// =============================================================================
// Board Configuration
// =============================================================================

/// Configuration of the board this image is built for
pub const BOARD: PlatformConfig = board_config();

const fn board_config() -> PlatformConfig {
    let config = PlatformConfig::QEMU_VIRT;
    let config = if cfg!(feature = "monitor-hart") {
        config.with_base_hart(1)
    } else {
        config
    };
    if cfg!(feature = "tickless") {
        config.with_timer_mode(TimerMode::Tickless)
    } else {
        config
    }
}

const_assert!(BOARD.is_valid());

/// Logical cpu to hart mapping of the board
pub const HART_MAP: HartMap = match HartMap::from_config(&BOARD) {
    Ok(map) => map,
    Err(_) => panic!("board hart range exceeds the hart tables"),
};

// =============================================================================
// Local CPU
// =============================================================================

/// CSR-backed operations on the calling hart
#[derive(Debug, Clone, Copy)]
pub struct CsrCpu {
    mode: PrivilegeMode,
}

impl CsrCpu {
    /// Operations for interrupts of `mode`
    pub const fn new(mode: PrivilegeMode) -> Self {
        Self { mode }
    }
}

impl LocalCpu for CsrCpu {
    fn hart_id(&self) -> HartId {
        match self.mode {
            PrivilegeMode::Machine => HartId::new(csr::read_mhartid()),
            PrivilegeMode::Supervisor => HartId::new(csr::read_tp()),
        }
    }

    fn enable_lines(&self, lines: IrqLines) {
        match self.mode {
            PrivilegeMode::Machine => csr::set_mie(lines.bits()),
            PrivilegeMode::Supervisor => csr::set_sie(lines.bits()),
        }
    }

    fn irq_unlock_global(&self) {
        match self.mode {
            PrivilegeMode::Machine => csr::read_set_mstatus(status::MIE),
            PrivilegeMode::Supervisor => csr::read_set_sstatus(status::SIE),
        };
    }

    fn irq_lock(&self) -> IrqKey {
        match self.mode {
            PrivilegeMode::Machine => IrqKey(csr::read_clear_mstatus(status::MIE) & status::MIE),
            PrivilegeMode::Supervisor => IrqKey(csr::read_clear_sstatus(status::SIE) & status::SIE),
        }
    }

    fn irq_restore(&self, key: IrqKey) {
        if key.0 != 0 {
            self.irq_unlock_global();
        }
    }
}

// =============================================================================
// Kernel and Platform Links
// =============================================================================

extern "C" {
    fn kernel_announce_ticks(ticks: u32);
    fn kernel_sched_ipi();
    fn kernel_cpu_record(cpu: usize) -> usize;
    #[cfg(feature = "pmp-stack-guard")]
    fn platform_configure_stack_guard();
    #[cfg(feature = "cache-setup")]
    fn platform_cache_setup();
}

/// Kernel callbacks resolved at link time
#[derive(Debug, Clone, Copy)]
pub struct KernelLink;

impl KernelHooks for KernelLink {
    fn announce_ticks(&self, ticks: u32) {
        // SAFETY: provided by the kernel, callable from interrupt context.
        unsafe { kernel_announce_ticks(ticks) }
    }

    fn sched_ipi(&self) {
        // SAFETY: provided by the kernel, callable from interrupt context.
        unsafe { kernel_sched_ipi() }
    }

    fn cpu_record(&self, cpu: CpuIndex) -> CpuHandle {
        // SAFETY: provided by the kernel; `cpu` is a configured index.
        CpuHandle::from_raw(unsafe { kernel_cpu_record(cpu.as_usize()) })
    }
}

/// Per-core setup resolved at link time
#[derive(Debug, Clone, Copy)]
pub struct BoardSetup;

impl CoreSetup for BoardSetup {
    #[cfg(feature = "pmp-stack-guard")]
    fn configure_stack_guard(&self) {
        // SAFETY: runs once per hart before its interrupts are unmasked.
        unsafe { platform_configure_stack_guard() }
    }

    #[cfg(feature = "cache-setup")]
    fn setup_caches(&self) {
        // SAFETY: runs once per hart before its interrupts are unmasked.
        unsafe { platform_cache_setup() }
    }
}

// =============================================================================
// Timer Services
// =============================================================================

/// Deadlines and hart starts for the board's privilege level
///
/// A machine-mode port owns the CLINT; a supervisor-mode port asks the SBI
/// monitor.
#[derive(Debug, Clone, Copy)]
pub struct BoardFirmware;

impl FirmwareGateway for BoardFirmware {
    fn set_timer(&self, absolute_time: u64) -> SbiRet {
        match BOARD.irq_mode {
            PrivilegeMode::Machine => CLINT_GATEWAY.set_timer(absolute_time),
            PrivilegeMode::Supervisor => Sbi.set_timer(absolute_time),
        }
    }

    fn hart_start(&self, hart: HartId, entry: usize, opaque: usize) -> SbiRet {
        match BOARD.irq_mode {
            PrivilegeMode::Machine => CLINT_GATEWAY.hart_start(hart, entry, opaque),
            PrivilegeMode::Supervisor => Sbi.hart_start(hart, entry, opaque),
        }
    }
}

/// Free-running counter: `mtime` in machine mode, the `time` CSR otherwise
#[derive(Debug, Clone, Copy)]
pub struct BoardCounter;

impl CycleCounter for BoardCounter {
    fn read(&self) -> u64 {
        match BOARD.irq_mode {
            PrivilegeMode::Machine => CLINT.mtime(),
            PrivilegeMode::Supervisor => TimeCsr.read(),
        }
    }
}

// =============================================================================
// Statics
// =============================================================================

/// Wake flags; not zeroed at load, the boot stub indexes them by mhartid
#[export_name = "hart_wake_flags"]
#[link_section = ".noinit.hart_wake_flags"]
pub static WAKE_FLAGS: WakeFlagTable = WakeFlagTable::new();

/// Stack top of the hart being started, read by the boot stub
#[export_name = "riscv_cpu_sp"]
pub static STACK_HANDOFF: StackHandoff = StackHandoff::new();

/// Start requests and cpu records
pub static START_TABLE: StartTable = StartTable::new();

/// Interrupt handlers, shared by every hart
pub static ISR_TABLE: IsrTable = IsrTable::new(BOARD.irq_mode);

// SAFETY: the CLINT is mapped at this address on the board.
static CLINT: Clint = unsafe { Clint::new(CLINT_BASE_QEMU) };

const CPU: CsrCpu = CsrCpu::new(BOARD.irq_mode);

static CLINT_GATEWAY: ClintGateway<'static, CsrCpu> = ClintGateway::new(&CLINT, CPU);

/// Wake coordinator, used by the boot hart only
pub static COORDINATOR: HartWakeCoordinator<'static, &'static Clint, KernelLink> =
    HartWakeCoordinator::new(
        HART_MAP,
        BootTables {
            flags: &WAKE_FLAGS,
            handoff: &STACK_HANDOFF,
            starts: &START_TABLE,
        },
        &CLINT,
        KernelLink,
    );

/// Secondary entry sequencer
pub static SECONDARY: SecondarySequencer<'static, CsrCpu, BoardSetup> =
    SecondarySequencer::new(HART_MAP, BOARD.irq_mode, &START_TABLE, CPU, BoardSetup);

/// Scheduler IPIs
pub static SCHED_IPI: SchedIpi<&'static Clint, CsrCpu, &'static IsrTable, KernelLink> =
    SchedIpi::new(HART_MAP, BOARD.irq_mode, &CLINT, CPU, &ISR_TABLE, KernelLink);

/// System tick
pub static TICK_TIMER: TickTimer<BoardCounter, BoardFirmware, CsrCpu, &'static IsrTable, KernelLink> =
    TickTimer::new(&BOARD, BoardCounter, BoardFirmware, CPU, &ISR_TABLE, KernelLink);

// =============================================================================
// Entry Points
// =============================================================================

fn sched_ipi_isr() {
    SCHED_IPI.on_software_interrupt();
}

fn timer_isr() {
    TICK_TIMER.on_timer_interrupt();
}

/// Bring up scheduler IPIs on the boot hart
pub fn sched_ipi_init() -> Result<(), IrqError> {
    SCHED_IPI.init(sched_ipi_isr)
}

/// Bring up the system tick on the boot hart
pub fn sys_clock_init() -> Result<(), IrqError> {
    TICK_TIMER.initialize(timer_isr)
}

/// Power on the hart of `cpu` at the board's start address, then run the
/// wake handshake with it
///
/// Take the token from [`START_TABLE`] once and pass it back in for every
/// secondary, in order. A hart the firmware refuses to start is reported
/// and still waited for: if it never answers, the boot hart stops here.
pub fn start_secondary_hart(
    token: StartToken<'static>,
    cpu: CpuIndex,
    stack: usize,
    stack_size: usize,
    entry: CpuStartFn,
    arg: usize,
) -> Result<StartToken<'static>, SmpError> {
    match COORDINATOR.power_on(&BoardFirmware, cpu, BOARD.hart_start_addr) {
        Ok(()) | Err(SbiError::AlreadyStarted) => {},
        Err(_) => log::error!("smp: {} was not started, waiting for it anyway", cpu),
    }
    COORDINATOR.start_core(token, cpu, stack, stack_size, entry, arg)
}

/// Interrupt dispatch, called from the trap vector with `xcause`
///
/// Returns `false` for exceptions and unconnected interrupts.
#[no_mangle]
pub extern "C" fn rvport_trap_irq(cause: usize) -> bool {
    match csr::decode_cause(cause) {
        (true, code) => ISR_TABLE.dispatch(code),
        (false, _) => false,
    }
}

/// Secondary entry, called by the boot stub after `DONE` on the new stack
#[no_mangle]
pub extern "C" fn rvport_secondary_start(cpu: usize) -> ! {
    SECONDARY.secondary_entry(cpu)
}
