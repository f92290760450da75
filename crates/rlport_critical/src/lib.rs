#![cfg_attr(not(test), no_std)]

use core::sync::atomic::{Ordering, compiler_fence};
use rlport_traits::interrupt::InterruptMask;

/// Nesting value before the scheduler starts. Anything but zero keeps
/// `exit` from enabling interrupts during boot.
pub const INITIAL_CRITICAL_NESTING: u16 = 10;

pub const NO_CRITICAL_NESTING: u16 = 0;

/// Number of outstanding critical section entries of the running task.
///
/// Only touched with interrupts disabled in hardware. A copy travels in every
/// saved context frame, so the live value always belongs to the task that is
/// running right now.
#[derive(Debug)]
pub struct CriticalNesting(u16);

impl CriticalNesting {
    pub const fn new() -> Self {
        Self(INITIAL_CRITICAL_NESTING)
    }

    #[inline(always)]
    pub fn enter(&mut self, cpu: &mut impl InterruptMask) {
        cpu.disable_interrupts();
        self.0 = self.0.wrapping_add(1);
        compiler_fence(Ordering::AcqRel);
    }

    /// Leaving without a matching `enter` is the caller's bug and is not
    /// checked here.
    #[inline(always)]
    pub fn exit(&mut self, cpu: &mut impl InterruptMask) {
        compiler_fence(Ordering::AcqRel);
        self.0 = self.0.wrapping_sub(1);

        if self.0 == NO_CRITICAL_NESTING {
            cpu.enable_interrupts();
        }
    }

    #[inline(always)]
    pub fn count(&self) -> u16 {
        self.0
    }

    /// Replaces the live value with one popped from a saved context.
    #[inline(always)]
    pub fn load(&mut self, count: u16) {
        self.0 = count;
        compiler_fence(Ordering::AcqRel);
    }

    pub fn is_nested(&self) -> bool {
        self.0 != NO_CRITICAL_NESTING
    }
}

impl Default for CriticalNesting {
    fn default() -> Self {
        Self::new()
    }
}

#[macro_export]
macro_rules! assert_critical_nesting_eq {
    ($nesting:expr, $n:expr) => {{
        assert_eq!(
            $nesting.count(),
            $n,
            "Critical nesting does not equal to {}",
            $n,
        );
    }};

    ($nesting:expr, $n:expr, $msg:literal) => {{
        assert_eq!(
            $nesting.count(),
            $n,
            "{}: Critical nesting does not equal to {}",
            $msg,
            $n,
        );
    }};
}
