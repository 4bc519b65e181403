//! # ISR Table
//!
//! Minimal cause-indexed handler table used by the RISC-V glue in place of
//! the kernel's interrupt framework. Slots are write-once: a line is
//! connected during system initialization and never rerouted.

use spin::Once;

use super::{IrqLine, Isr, IsrRegistry, PrivilegeMode};

/// Number of local interrupt causes covered by the table
pub const MAX_CAUSES: usize = 16;

/// IRQ management errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// Cause code outside the table
    InvalidLine,
    /// Line already routed to a handler
    AlreadyConnected,
}

/// Cause-indexed ISR table
#[derive(Debug)]
pub struct IsrTable {
    mode: PrivilegeMode,
    slots: [Once<Isr>; MAX_CAUSES],
}

impl IsrTable {
    /// Create an empty table for `mode` interrupt numbering
    pub const fn new(mode: PrivilegeMode) -> Self {
        const EMPTY: Once<Isr> = Once::new();
        Self {
            mode,
            slots: [EMPTY; MAX_CAUSES],
        }
    }

    /// Is `line` connected?
    pub fn is_connected(&self, line: IrqLine) -> bool {
        self.slots
            .get(line.cause(self.mode))
            .map_or(false, |slot| slot.is_completed())
    }

    /// Run the handler for an interrupt cause code
    ///
    /// Returns `false` for an unconnected cause.
    pub fn dispatch(&self, cause: usize) -> bool {
        match self.slots.get(cause).and_then(Once::get) {
            Some(isr) => {
                isr();
                true
            },
            None => {
                log::trace!("irq: spurious cause {}", cause);
                false
            },
        }
    }
}

impl IsrRegistry for IsrTable {
    fn connect(&self, line: IrqLine, isr: Isr) -> Result<(), IrqError> {
        let slot = self
            .slots
            .get(line.cause(self.mode))
            .ok_or(IrqError::InvalidLine)?;

        let mut installed = false;
        slot.call_once(|| {
            installed = true;
            isr
        });

        if installed {
            Ok(())
        } else {
            Err(IrqError::AlreadyConnected)
        }
    }
}
