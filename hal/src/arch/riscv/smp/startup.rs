//! # Secondary Hart Startup
//!
//! The boot hart releases secondaries one at a time:
//!
//! 1. Record `{entry, arg}` for the cpu and bind its kernel cpu record
//! 2. Publish the stack top in the single handoff slot
//! 3. Wait for the hart to announce `WAIT`
//! 4. Write `GO` and raise the hart's software interrupt
//! 5. Wait for `DONE`, re-raising the interrupt every 64th spin in case the
//!    first one was lost
//! 6. Clear the software interrupt
//!
//! A hart that never answers hangs the boot hart in step 3 or 5. There is no
//! timeout: nothing safe can be done without it, and the wait point shows in
//! a debugger exactly which hart failed.

use super::handoff::{BootTables, PendingStart, StartToken};
use super::{CpuIndex, HartMap, SmpError, WakeFlag};
use crate::arch::riscv::interrupts::SoftIrqPending;
use crate::arch::riscv::kernel::{CpuStartFn, KernelHooks};
use crate::arch::riscv::poll::{Spin, SpinCounter, SpinHook};
use crate::arch::riscv::sbi::{FirmwareGateway, SbiError};

/// Spins between two re-raises of the wake interrupt while waiting for `DONE`
pub const WAKE_RESEND_INTERVAL: usize = 64;

/// Boot-hart side of the wake protocol
#[derive(Debug)]
pub struct HartWakeCoordinator<'a, P, K, H = SpinCounter> {
    map: HartMap,
    tables: BootTables<'a>,
    pending: P,
    kernel: K,
    hook: H,
}

impl<'a, P, K> HartWakeCoordinator<'a, P, K>
where
    P: SoftIrqPending,
    K: KernelHooks,
{
    /// Create a coordinator that counts its spins
    pub const fn new(map: HartMap, tables: BootTables<'a>, pending: P, kernel: K) -> Self {
        Self {
            map,
            tables,
            pending,
            kernel,
            hook: SpinCounter::new(),
        }
    }
}

impl<'a, P, K, H> HartWakeCoordinator<'a, P, K, H>
where
    P: SoftIrqPending,
    K: KernelHooks,
    H: SpinHook,
{
    /// Replace the per-spin hook
    pub fn with_spin_hook<H2: SpinHook>(self, hook: H2) -> HartWakeCoordinator<'a, P, K, H2> {
        HartWakeCoordinator {
            map: self.map,
            tables: self.tables,
            pending: self.pending,
            kernel: self.kernel,
            hook,
        }
    }

    /// The per-spin hook
    pub fn spin_hook(&self) -> &H {
        &self.hook
    }

    /// Hart map in use
    pub fn map(&self) -> &HartMap {
        &self.map
    }

    /// Start secondary `cpu` and wait until it has taken its start parameters
    ///
    /// `stack_top = stack + stack_size` is handed to the hart. The token is
    /// returned once the hart confirmed `DONE`, at which point the handoff
    /// slot is free for the next start. A token issued by another start
    /// table is refused before anything is touched.
    pub fn start_core(
        &self,
        token: StartToken<'a>,
        cpu: CpuIndex,
        stack: usize,
        stack_size: usize,
        entry: CpuStartFn,
        arg: usize,
    ) -> Result<StartToken<'a>, SmpError> {
        if !token.issued_by(self.tables.starts) {
            log::error!("smp: {} start refused, token from another table", cpu);
            return Err(SmpError::ForeignToken);
        }

        let hart = self.map.hart_of(cpu);
        let flags = self.tables.flags;
        let spin = Spin::new(&self.hook);

        self.tables.starts.record(cpu, PendingStart { entry, arg });
        self.tables.starts.bind(cpu, self.kernel.cpu_record(cpu));

        let stack_top = stack + stack_size;
        self.tables.handoff.publish(stack_top);
        log::debug!("smp: {} ({}) stack top {:#x}", cpu, hart, stack_top);

        let spins = spin.until(|| flags.is(hart, WakeFlag::Wait));
        log::debug!("smp: {} waiting after {} spins", hart, spins);

        flags.store(hart, WakeFlag::Go);
        self.pending.raise(hart);

        let mut resends = 0usize;
        let spins = spin.until_with_retry(
            WAKE_RESEND_INTERVAL,
            || flags.is(hart, WakeFlag::Done),
            || {
                resends = resends.wrapping_add(1);
                self.pending.raise(hart);
            },
        );
        log::debug!("smp: {} done after {} spins ({} resends)", hart, spins, resends);

        self.pending.clear(hart);
        log::info!("smp: {} online on {}", cpu, hart);

        Ok(token)
    }

    /// Ask the firmware to start the hart of `cpu` at `entry_addr`
    ///
    /// The logical cpu index is passed as the opaque argument, so the boot
    /// stub receives it in `a1`.
    pub fn power_on<F: FirmwareGateway + ?Sized>(
        &self,
        firmware: &F,
        cpu: CpuIndex,
        entry_addr: usize,
    ) -> Result<(), SbiError> {
        let hart = self.map.hart_of(cpu);
        firmware
            .hart_start(hart, entry_addr, cpu.as_usize())
            .into_result()
            .map(|_| ())
            .map_err(|e| {
                log::warn!("smp: hart_start({}) failed: {}", hart, e);
                e
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::arch::riscv::smp::handoff::{StackHandoff, StartTable};
    use crate::arch::riscv::smp::{HartId, WakeFlagTable};
    use crate::arch::riscv::testing::{SimFirmware, SimKernel, SimPending};
    use crate::arch::riscv::MAX_HARTS;

    fn parked(_arg: usize) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    const STACK_SIZE: usize = 0x1000;

    fn stack_of(cpu: usize) -> usize {
        0x8010_0000 + cpu * STACK_SIZE
    }

    /// Boot stub of one secondary: WAIT, GO, read stack, DONE
    fn run_stub(flags: &WakeFlagTable, handoff: &StackHandoff, hart: HartId) -> usize {
        let hook = SpinCounter::new();
        flags.announce_wait(hart);
        flags.wait_for_go(hart, &hook);
        let stack_top = handoff.load();
        flags.confirm_done(hart);
        stack_top
    }

    #[test]
    fn test_start_core_with_monitor_hart() {
        let flags = WakeFlagTable::new();
        let handoff = StackHandoff::new();
        let starts = StartTable::new();
        let pending = SimPending::new();
        let kernel = SimKernel::new();
        let map = HartMap::new(1, 4).unwrap();
        let tables = BootTables {
            flags: &flags,
            handoff: &handoff,
            starts: &starts,
        };
        let coordinator = HartWakeCoordinator::new(map, tables, &pending, &kernel);
        let seen = Mutex::new(Vec::new());

        std::thread::scope(|s| {
            for cpu in 0..3 {
                let hart = map.hart_of(map.cpu(cpu).unwrap());
                let (flags, handoff, seen) = (&flags, &handoff, &seen);
                s.spawn(move || {
                    let stack_top = run_stub(flags, handoff, hart);
                    seen.lock().unwrap().push((hart, stack_top));
                });
            }

            let mut token = starts.take_token().unwrap();
            for cpu in 0..3 {
                let index = map.cpu(cpu).unwrap();
                token = coordinator
                    .start_core(token, index, stack_of(cpu), STACK_SIZE, parked, cpu)
                    .unwrap();

                // Earlier harts finished; later harts were never released.
                for started in 0..=cpu {
                    assert!(flags.is(HartId::new(started + 1), WakeFlag::Done));
                }
                for later in cpu + 1..4 {
                    let flag = flags.load(HartId::new(later + 1));
                    assert!(flag != Some(WakeFlag::Go) && flag != Some(WakeFlag::Done));
                }
            }
            drop(token);
        });

        // Each hart read its own stack top, never another's.
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 3);
        for (hart, stack_top) in seen {
            let cpu = map.cpu_of(hart).unwrap().as_usize();
            assert_eq!(stack_top, stack_of(cpu) + STACK_SIZE);
        }

        // Monitor hart and the fourth cpu were never touched.
        assert_eq!(flags.load(HartId::new(0)), None);
        assert_eq!(pending.raise_count(HartId::new(0)), 0);
        assert_eq!(pending.raise_count(HartId::new(4)), 0);

        for cpu in 0..3 {
            let index = map.cpu(cpu).unwrap();
            let hart = map.hart_of(index);
            assert!(!pending.is_raised(hart));
            assert!(pending.raise_count(hart) >= 1);
            assert_eq!(starts.take(index).map(|s| s.arg), Some(cpu));
            assert_eq!(starts.record_of(index), kernel.cpu_record(index));
        }
    }

    #[test]
    fn test_lost_wake_interrupt_is_resent() {
        let flags = WakeFlagTable::new();
        let handoff = StackHandoff::new();
        let starts = StartTable::new();
        let pending = SimPending::new();
        let kernel = SimKernel::new();
        let map = HartMap::new(0, 2).unwrap();
        let tables = BootTables {
            flags: &flags,
            handoff: &handoff,
            starts: &starts,
        };
        let hook = SpinCounter::new();
        let coordinator =
            HartWakeCoordinator::new(map, tables, &pending, &kernel).with_spin_hook(&hook);
        let cpu = map.cpu(1).unwrap();
        let hart = map.hart_of(cpu);

        std::thread::scope(|s| {
            s.spawn(|| {
                flags.announce_wait(hart);
                flags.wait_for_go(hart, &SpinCounter::new());
                // Only answer once the interrupt has been raised again.
                while pending.raise_count(hart) < 2 {
                    core::hint::spin_loop();
                }
                flags.confirm_done(hart);
            });

            let token = starts.take_token().unwrap();
            let _token = coordinator
                .start_core(token, cpu, 0x9000_0000, STACK_SIZE, parked, 0)
                .unwrap();
        });

        assert!(pending.raise_count(hart) >= 2);
        assert!(hook.count() >= WAKE_RESEND_INTERVAL);
        assert!(!pending.is_raised(hart));
    }

    #[test]
    fn test_flag_sequence_is_wait_go_done() {
        let flags = WakeFlagTable::new();
        let handoff = StackHandoff::new();
        let starts = StartTable::new();
        let pending = SimPending::new();
        let kernel = SimKernel::new();
        let map = HartMap::new(1, 3).unwrap();
        let tables = BootTables {
            flags: &flags,
            handoff: &handoff,
            starts: &starts,
        };
        let coordinator = HartWakeCoordinator::new(map, tables, &pending, &kernel);
        let waiting = AtomicUsize::new(0);
        let go_seen: [AtomicBool; MAX_HARTS] = core::array::from_fn(|_| AtomicBool::new(false));

        std::thread::scope(|s| {
            for hart in map.harts() {
                let (flags, handoff, go_seen) = (&flags, &handoff, &go_seen);
                s.spawn(move || {
                    flags.announce_wait(hart);
                    flags.wait_for_go(hart, &SpinCounter::new());
                    let _ = handoff.load();
                    // Hold GO until the observer has recorded it.
                    while !go_seen[hart.as_usize()].load(Ordering::SeqCst) {
                        core::hint::spin_loop();
                    }
                    flags.confirm_done(hart);
                });
            }

            let observer = s.spawn(|| {
                let mut history = vec![Vec::new(); MAX_HARTS];
                loop {
                    let mut done = 0;
                    for hart in map.harts() {
                        let seen: &mut Vec<WakeFlag> = &mut history[hart.as_usize()];
                        let Some(flag) = flags.load(hart) else { continue };
                        if seen.last() != Some(&flag) {
                            seen.push(flag);
                            match flag {
                                WakeFlag::Wait => {
                                    waiting.fetch_add(1, Ordering::SeqCst);
                                },
                                WakeFlag::Go => go_seen[hart.as_usize()].store(true, Ordering::SeqCst),
                                WakeFlag::Done => {},
                            }
                        }
                        if flag == WakeFlag::Done {
                            done += 1;
                        }
                    }
                    if done == map.num_cpus() {
                        break history;
                    }
                    core::hint::spin_loop();
                }
            });

            // Every hart is parked in WAIT before the first release.
            while waiting.load(Ordering::SeqCst) < map.num_cpus() {
                core::hint::spin_loop();
            }

            let mut token = starts.take_token().unwrap();
            for cpu in 0..map.num_cpus() {
                let index = map.cpu(cpu).unwrap();
                token = coordinator
                    .start_core(token, index, stack_of(cpu), STACK_SIZE, parked, cpu)
                    .unwrap();
            }
            drop(token);

            let history = observer.join().unwrap();
            for hart in map.harts() {
                assert_eq!(
                    history[hart.as_usize()],
                    vec![WakeFlag::Wait, WakeFlag::Go, WakeFlag::Done],
                    "{}",
                    hart
                );
            }
            assert!(history[0].is_empty());
        });
    }

    #[test]
    fn test_foreign_token_is_refused() {
        let flags = WakeFlagTable::new();
        let handoff = StackHandoff::new();
        let starts = StartTable::new();
        let other = StartTable::new();
        let pending = SimPending::new();
        let kernel = SimKernel::new();
        let map = HartMap::new(0, 2).unwrap();
        let tables = BootTables {
            flags: &flags,
            handoff: &handoff,
            starts: &starts,
        };
        let coordinator = HartWakeCoordinator::new(map, tables, &pending, &kernel);
        let cpu = map.cpu(1).unwrap();

        let token = other.take_token().unwrap();
        assert_eq!(
            coordinator
                .start_core(token, cpu, 0x9000_0000, STACK_SIZE, parked, 0)
                .err(),
            Some(SmpError::ForeignToken)
        );

        // Nothing was recorded or signalled.
        assert!(starts.take(cpu).is_none());
        assert_eq!(handoff.load(), 0);
        assert_eq!(pending.raise_count(map.hart_of(cpu)), 0);
        assert_eq!(flags.load(map.hart_of(cpu)), None);
    }

    #[test]
    fn test_power_on_passes_cpu_index() {
        let flags = WakeFlagTable::new();
        let handoff = StackHandoff::new();
        let starts = StartTable::new();
        let pending = SimPending::new();
        let kernel = SimKernel::new();
        let map = HartMap::new(1, 4).unwrap();
        let tables = BootTables {
            flags: &flags,
            handoff: &handoff,
            starts: &starts,
        };
        let coordinator = HartWakeCoordinator::new(map, tables, &pending, &kernel);
        let firmware = SimFirmware::new();

        let cpu = map.cpu(2).unwrap();
        assert_eq!(coordinator.power_on(&firmware, cpu, 0x8000_0000), Ok(()));
        assert_eq!(firmware.started(), vec![(HartId::new(3), 0x8000_0000, 2)]);

        firmware.fail_with(-7);
        assert_eq!(
            coordinator.power_on(&firmware, cpu, 0x8000_0000),
            Err(SbiError::AlreadyStarted)
        );
    }
}
