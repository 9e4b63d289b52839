//! Run gate for the AICA's ARM7DI sound CPU.
//!
//! The ARM7 is clocked by the scheduler, not by this crate. The gate is the
//! "halted" flag the scheduler polls before giving the ARM7 a slice; the AICA
//! flips it through `SecondaryCore` when the SH4 writes ARMRST.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run-state control of a processor owned by another device.
pub trait SecondaryCore: Send {
    fn suspend(&mut self);
    fn resume(&mut self);
}

/// Shared halted flag. Clones observe the same flag.
#[derive(Clone, Debug)]
pub struct Arm7Gate {
    halted: Arc<AtomicBool>,
}

impl Default for Arm7Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Arm7Gate {
    /// Starts halted; the ARM7 is held in reset at power on.
    pub fn new() -> Self {
        Self {
            halted: Arc::new(AtomicBool::new(true)),
        }
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Runs `slice` with `cycles` if the ARM7 is released, returning the
    /// cycles it consumed.
    pub fn run_slice(&self, cycles: u32, slice: impl FnOnce(u32) -> u32) -> u32 {
        if self.is_halted() {
            return 0;
        }
        slice(cycles)
    }
}

impl SecondaryCore for Arm7Gate {
    fn suspend(&mut self) {
        self.halted.store(true, Ordering::Release);
    }

    fn resume(&mut self) {
        self.halted.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let mut gate = Arm7Gate::new();
        let scheduler_view = gate.clone();
        assert!(scheduler_view.is_halted());

        gate.resume();
        assert!(!scheduler_view.is_halted());
        gate.suspend();
        assert!(scheduler_view.is_halted());
    }

    #[test]
    fn halted_core_gets_no_cycles() {
        let mut gate = Arm7Gate::new();
        assert_eq!(gate.run_slice(448, |c| c), 0);
        gate.resume();
        assert_eq!(gate.run_slice(448, |c| c / 2), 224);
    }
}
