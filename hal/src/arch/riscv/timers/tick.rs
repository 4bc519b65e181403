//! # System Tick Driver
//!
//! Converts the free-running counter into kernel ticks. Every timer
//! interrupt programs the next deadline one tick after the current sample
//! through the firmware and announces one tick. In tickless mode the kernel
//! can also ask how many whole ticks have passed since the last announce.
//!
//! The deadline is always `CYC_PER_TICK` past the sample taken in the same
//! interrupt; the driver never reprograms a longer interval.

use super::CycleCounter;
use crate::arch::riscv::config::{PlatformConfig, TimerMode};
use crate::arch::riscv::interrupts::{IrqError, IrqLine, Isr, IsrRegistry, LocalCpu, PrivilegeMode};
use crate::arch::riscv::kernel::KernelHooks;
use crate::arch::riscv::sbi::FirmwareGateway;
use crate::arch::riscv::sync::IrqSpinLock;

/// Shared timer bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    /// Counter value at the last announce (or at initialization)
    pub last_sample: u64,
    /// Counter value of the last tick boundary
    pub last_tick_time: u64,
    /// Result of the last elapsed-ticks query
    pub elapsed_ticks: u32,
}

/// System tick driver
#[derive(Debug)]
pub struct TickTimer<T, F, C, R, K> {
    mode: TimerMode,
    irq_mode: PrivilegeMode,
    cycles_per_tick: u64,
    counter: T,
    firmware: F,
    cpu: C,
    registry: R,
    kernel: K,
    state: IrqSpinLock<TimerState>,
}

impl<T, F, C, R, K> TickTimer<T, F, C, R, K>
where
    T: CycleCounter,
    F: FirmwareGateway,
    C: LocalCpu,
    R: IsrRegistry,
    K: KernelHooks,
{
    /// Create a driver for `config`
    pub const fn new(
        config: &PlatformConfig,
        counter: T,
        firmware: F,
        cpu: C,
        registry: R,
        kernel: K,
    ) -> Self {
        Self {
            mode: config.timer_mode,
            irq_mode: config.irq_mode,
            cycles_per_tick: config.cycles_per_tick(),
            counter,
            firmware,
            cpu,
            registry,
            kernel,
            state: IrqSpinLock::new(TimerState {
                last_sample: 0,
                last_tick_time: 0,
                elapsed_ticks: 0,
            }),
        }
    }

    /// Hardware cycles per kernel tick
    pub const fn cycles_per_tick(&self) -> u64 {
        self.cycles_per_tick
    }

    /// Configured mode
    pub const fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Snapshot of the shared state
    pub fn state(&self) -> TimerState {
        *self.state.lock(&self.cpu)
    }

    /// Current value of the free-running counter
    pub fn read_hardware_time(&self) -> u64 {
        self.counter.read()
    }

    /// Low 32 bits of the counter
    pub fn cycle_get_32(&self) -> u32 {
        self.read_hardware_time() as u32
    }

    /// Full 64-bit counter
    pub fn cycle_get_64(&self) -> u64 {
        self.read_hardware_time()
    }

    fn set_deadline(&self, deadline: u64) {
        if let Err(e) = self.firmware.set_timer(deadline).into_result() {
            log::warn!("timer: set_timer({}) failed: {}", deadline, e);
        }
    }

    /// Timer interrupt handler
    ///
    /// Programs the next deadline one tick past now, then announces one
    /// tick with the lock released.
    pub fn on_timer_interrupt(&self) {
        {
            let mut state = self.state.lock(&self.cpu);
            let now = self.read_hardware_time();
            self.set_deadline(now + self.cycles_per_tick);
            state.last_sample = now;
            state.last_tick_time = now;
        }

        log::trace!("timer: tick");
        self.kernel.announce_ticks(1);
    }

    /// Whole ticks elapsed since the last announce
    ///
    /// Always zero in periodic mode. The query does not consume time: until
    /// the next tick interrupt, repeated calls return the same or a larger
    /// value.
    pub fn elapsed_ticks_since_last_announce(&self) -> u32 {
        if !self.mode.is_tickless() {
            return 0;
        }

        let mut state = self.state.lock(&self.cpu);
        let now = self.read_hardware_time();
        let ticks = now
            .wrapping_sub(state.last_sample)
            .checked_div(self.cycles_per_tick)
            .unwrap_or(0);
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        state.elapsed_ticks = ticks;
        ticks
    }

    /// Connect `isr` to the timer interrupt, arm the first tick, and unmask
    /// interrupts on the calling hart
    ///
    /// `isr` must end up in [`TickTimer::on_timer_interrupt`].
    pub fn initialize(&self, isr: Isr) -> Result<(), IrqError> {
        self.registry.connect(IrqLine::Timer, isr)?;

        {
            let mut state = self.state.lock(&self.cpu);
            let baseline = self.read_hardware_time();
            state.last_sample = baseline;
            state.last_tick_time = baseline;
            self.set_deadline(baseline + self.cycles_per_tick);
        }

        self.cpu.enable_lines(IrqLine::Timer.enable_bit(self.irq_mode));
        self.cpu.irq_unlock_global();

        log::info!(
            "timer: {:?} mode, {} cycles per tick",
            self.mode,
            self.cycles_per_tick
        );
        Ok(())
    }

    /// Arm the tick on a secondary hart
    ///
    /// The first deadline is one tick after the last recorded sample.
    pub fn smp_timer_init(&self) {
        let last_sample = self.state.lock(&self.cpu).last_sample;
        self.set_deadline(last_sample + self.cycles_per_tick);
        self.cpu.enable_lines(IrqLine::Timer.enable_bit(self.irq_mode));
        log::debug!("timer: armed on {}", self.cpu.hart_id());
    }
}
